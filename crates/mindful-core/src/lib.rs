//! mindful-core - Core library for Mindful
//!
//! This crate contains the shared models, local storage, remote document
//! store, and the offline-first journal synchronization used by all Mindful
//! interfaces.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod mood;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod tips;
pub mod util;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use models::{EntryDraft, EntryId, JournalEntry, MoodEntry, SyncStatus};
pub use sync::{JournalSyncService, SyncReport};
