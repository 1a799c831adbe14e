//! Durable on-device key-value storage

mod libsql_store;

pub use libsql_store::LibSqlKeyValueStore;

use async_trait::async_trait;

use crate::error::Result;

/// Key holding the live journal collection
pub const JOURNAL_ENTRIES_KEY: &str = "journalEntries";
/// Key holding the pending-sync queue
pub const PENDING_SYNC_KEY: &str = "pendingJournalSync";
/// Key holding the current mood
pub const CURRENT_MOOD_KEY: &str = "currentMood";

/// Async get/set/remove of string blobs by key, durable across restarts
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` if present
    async fn remove(&self, key: &str) -> Result<()>;
}
