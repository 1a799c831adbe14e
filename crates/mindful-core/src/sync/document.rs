//! Conversion between journal entries and remote documents

use serde::{Deserialize, Serialize};

use crate::models::{EntryId, JournalEntry, SyncStatus};
use crate::remote::RemoteDocument;

/// Body of a journal document in the remote store
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JournalDocument {
    /// Local id of the entry that produced this document
    #[serde(default)]
    local_id: Option<String>,
    text: String,
    date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_modified: Option<i64>,
}

/// Remote representation of an entry; sync bookkeeping stays local
pub fn entry_to_document(entry: &JournalEntry) -> serde_json::Value {
    let document = JournalDocument {
        local_id: Some(entry.id.to_string()),
        text: entry.text.clone(),
        date: entry.date.clone(),
        mood: entry.mood.clone(),
        tags: entry.tags.clone(),
        last_modified: entry.last_modified,
    };
    serde_json::to_value(document).unwrap_or(serde_json::Value::Null)
}

/// Rebuild a synced entry from a remote document.
///
/// Documents written without a `lastModified` fall back to the server
/// timestamp. Returns `None` for documents that are not journal entries.
pub fn entry_from_document(document: &RemoteDocument) -> Option<JournalEntry> {
    let body: JournalDocument = match serde_json::from_value(document.data.clone()) {
        Ok(body) => body,
        Err(error) => {
            tracing::warn!("Skipping malformed remote document {}: {error}", document.id);
            return None;
        }
    };

    Some(JournalEntry {
        id: EntryId::from(body.local_id.unwrap_or_else(|| document.id.clone())),
        remote_id: Some(document.id.clone()),
        text: body.text,
        date: body.date,
        mood: body.mood,
        tags: body.tags,
        sync_status: SyncStatus::Synced,
        last_modified: body.last_modified.or(Some(document.updated_at)),
        marked_for_deletion: None,
    })
}
