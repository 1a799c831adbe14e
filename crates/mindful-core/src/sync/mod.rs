//! Offline-first journal synchronization
//!
//! The local key-value store is authoritative. Remote writes are attempted
//! opportunistically; anything that cannot reach the remote store is parked
//! in a durable pending queue and replayed when connectivity returns.

mod document;
mod local;
mod merge;
mod service;

pub use document::{entry_from_document, entry_to_document};
pub use local::LocalJournal;
pub use merge::merge_entries;
pub use service::{JournalSyncService, SyncReport};
