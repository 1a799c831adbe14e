//! Journal export helpers shared by every client.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::{JournalEntry, SyncStatus};

/// Export output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Serializable entry representation used in JSON and Markdown exports.
///
/// Sync bookkeeping other than the status is left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEntry {
    pub id: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    pub tags: Vec<String>,
    pub sync_status: SyncStatus,
    pub text: String,
}

/// Convert an entry into an export record with stable tag ordering.
#[must_use]
pub fn entry_to_export_item(entry: &JournalEntry) -> ExportEntry {
    let mut tags = entry.tag_list().to_vec();
    tags.sort();
    tags.dedup();

    ExportEntry {
        id: entry.id.to_string(),
        date: entry.date.clone(),
        mood: entry.mood.clone(),
        tags,
        sync_status: entry.sync_status,
        text: entry.text.clone(),
    }
}

/// Render entries as pretty-printed JSON.
pub fn render_json_export(entries: &[JournalEntry]) -> serde_json::Result<String> {
    let items = entries
        .iter()
        .map(entry_to_export_item)
        .collect::<Vec<ExportEntry>>();
    serde_json::to_string_pretty(&items)
}

/// Render entries in Markdown with frontmatter blocks.
#[must_use]
pub fn render_markdown_export(entries: &[JournalEntry]) -> String {
    let mut output = String::new();

    for (index, entry) in entries.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }

        let item = entry_to_export_item(entry);
        let _ = writeln!(output, "---");
        let _ = writeln!(output, "id: {}", item.id);
        let _ = writeln!(output, "date: {}", item.date);
        if let Some(mood) = &item.mood {
            let _ = writeln!(output, "mood: {mood}");
        }
        let _ = writeln!(output, "tags:");
        for tag in item.tags {
            let _ = writeln!(output, "  - {tag}");
        }
        let _ = writeln!(output, "syncStatus: {}", item.sync_status);
        let _ = writeln!(output, "---");
        let _ = writeln!(output);
        output.push_str(&item.text);
        output.push('\n');
    }

    output
}

/// Render entries based on selected export format.
pub fn render_entries_export(
    entries: &[JournalEntry],
    format: ExportFormat,
) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(entries),
        ExportFormat::Markdown => Ok(render_markdown_export(entries)),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("mindful-journal-{timestamp_ms}.{}", format.extension())
}
