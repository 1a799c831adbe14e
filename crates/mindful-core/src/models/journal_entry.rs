//! Journal entry model

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// A unique identifier for a journal entry.
///
/// Freshly created entries use UUID v7 (time-sortable). Entries that arrive
/// from the remote store keep whatever id they were created with, so the
/// inner value is an arbitrary string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Create a new unique entry ID derived from the current instant
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Reconciliation state of an entry against the remote store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Synced,
    Pending,
    Error,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Pending => "pending",
            Self::Error => "error",
        }
    }

    /// Whether the entry carries local changes the remote has not seen yet
    #[must_use]
    pub const fn is_unsynced(self) -> bool {
        matches!(self, Self::Pending | Self::Error)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User input for a new journal entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub text: String,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EntryDraft {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A journal entry, persisted locally as camelCase JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Local primary key, never changes once assigned
    pub id: EntryId,
    /// Document id assigned by the remote store on first upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// User-authored body
    pub text: String,
    /// RFC 3339 creation timestamp, the collection sort key
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub sync_status: SyncStatus,
    /// Modification timestamp (Unix ms) used for conflict resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
    /// Set on pending-queue records that carry a remote deletion intent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked_for_deletion: Option<bool>,
}

impl JournalEntry {
    /// Build a fresh entry from a draft, stamped with the current instant
    #[must_use]
    pub fn from_draft(draft: EntryDraft, sync_status: SyncStatus) -> Self {
        let now = Utc::now();
        Self {
            id: EntryId::new(),
            remote_id: None,
            text: draft.text,
            date: format_entry_date(now),
            mood: draft.mood.filter(|mood| !mood.trim().is_empty()),
            tags: Some(draft.tags),
            sync_status,
            last_modified: Some(now.timestamp_millis()),
            marked_for_deletion: None,
        }
    }

    /// Check if the body is empty (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Whether this record carries a remote deletion intent
    #[must_use]
    pub fn is_deletion_intent(&self) -> bool {
        self.marked_for_deletion.unwrap_or(false)
    }

    /// Tags in insertion order, empty when none were set
    #[must_use]
    pub fn tag_list(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }

    /// Parsed creation date, when `date` is valid RFC 3339
    #[must_use]
    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.date)
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }

    /// First line of the body collapsed and truncated to `max_chars`,
    /// with a trailing ellipsis when shortened
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> String {
        let first_line = self.text.lines().next().unwrap_or("").trim();
        let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

        if collapsed.chars().count() <= max_chars {
            collapsed
        } else {
            let take_len = max_chars.saturating_sub(3);
            let mut truncated = collapsed.chars().take(take_len).collect::<String>();
            truncated.push_str("...");
            truncated
        }
    }
}

/// Format a timestamp the way entry dates are stored
#[must_use]
pub fn format_entry_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Newest-first ordering by `date`.
///
/// Dates that fail to parse sort after valid ones and fall back to string order.
pub fn compare_newest_first(a: &JournalEntry, b: &JournalEntry) -> Ordering {
    match (a.parsed_date(), b.parsed_date()) {
        (Some(a_date), Some(b_date)) => b_date.cmp(&a_date),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.date.cmp(&a.date),
    }
}

/// Sort a collection by `date` descending (stable)
pub fn sort_newest_first(entries: &mut [JournalEntry]) {
    entries.sort_by(compare_newest_first);
}
