//! Data models for Mindful

mod journal_entry;
mod mood;

pub use journal_entry::{
    compare_newest_first, format_entry_date, sort_newest_first, EntryDraft, EntryId,
    JournalEntry, SyncStatus,
};
pub use mood::{mood_palette, MoodEntry, MoodPalette, KNOWN_MOODS};
