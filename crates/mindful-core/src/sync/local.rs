//! Local persistence of the journal collection and the pending-sync queue

use std::sync::Arc;

use crate::error::Result;
use crate::models::{sort_newest_first, EntryId, JournalEntry};
use crate::storage::{KeyValueStore, JOURNAL_ENTRIES_KEY, PENDING_SYNC_KEY};
use crate::util::unix_millis_now;

/// Typed access to the two JSON blobs backing the journal.
///
/// Callers are responsible for serializing read-modify-write sequences.
#[derive(Clone)]
pub struct LocalJournal {
    store: Arc<dyn KeyValueStore>,
}

impl LocalJournal {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the live collection, newest first
    pub async fn load_entries(&self) -> Result<Vec<JournalEntry>> {
        let mut entries = self.load_list(JOURNAL_ENTRIES_KEY).await?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    /// Sort and persist the live collection
    pub async fn save_entries(&self, entries: &mut [JournalEntry]) -> Result<()> {
        sort_newest_first(entries);
        self.save_list(JOURNAL_ENTRIES_KEY, entries).await
    }

    pub async fn load_queue(&self) -> Result<Vec<JournalEntry>> {
        self.load_list(PENDING_SYNC_KEY).await
    }

    pub async fn save_queue(&self, queue: &[JournalEntry]) -> Result<()> {
        self.save_list(PENDING_SYNC_KEY, queue).await
    }

    /// Queue `record`, replacing any record already queued for the same entry
    pub async fn enqueue(&self, record: JournalEntry) -> Result<()> {
        let mut queue = self.load_queue().await?;
        queue.retain(|queued| queued.id != record.id);
        queue.push(record);
        self.save_queue(&queue).await
    }

    /// Drop every queued record for `id`
    pub async fn dequeue(&self, id: &EntryId) -> Result<()> {
        let mut queue = self.load_queue().await?;
        let before = queue.len();
        queue.retain(|queued| &queued.id != id);
        if queue.len() == before {
            return Ok(());
        }
        self.save_queue(&queue).await
    }

    /// Drop `record` only if it is still the queued copy; a newer record for
    /// the same entry stays
    pub async fn dequeue_record(&self, record: &JournalEntry) -> Result<()> {
        let mut queue = self.load_queue().await?;
        let before = queue.len();
        queue.retain(|queued| queued != record);
        if queue.len() == before {
            return Ok(());
        }
        self.save_queue(&queue).await
    }

    async fn load_list(&self, key: &str) -> Result<Vec<JournalEntry>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<JournalEntry>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(error) => {
                let backup_key = format!("{key}.corrupt-{}", unix_millis_now());
                tracing::warn!(
                    "Stored value under '{key}' is not valid journal JSON ({error}); \
                     preserving it as '{backup_key}' and starting empty"
                );
                self.store.set(&backup_key, &raw).await?;
                Ok(Vec::new())
            }
        }
    }

    async fn save_list(&self, key: &str, entries: &[JournalEntry]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.store.set(key, &raw).await
    }
}
