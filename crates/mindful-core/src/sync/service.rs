//! Journal synchronization service

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::document::{entry_from_document, entry_to_document};
use super::local::LocalJournal;
use super::merge::merge_entries;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{Error, Result};
use crate::models::{EntryDraft, EntryId, JournalEntry, SyncStatus};
use crate::remote::{RemoteDocument, RemoteStore, SortDirection, JOURNAL_COLLECTION};
use crate::storage::KeyValueStore;
use crate::util::unix_millis_now;

const ORDER_FIELD: &str = "date";

/// Outcome of one pending-queue replay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records reconciled with the remote store and removed from the queue
    pub synced: usize,
    /// Records that failed and stay queued
    pub failed: usize,
}

impl SyncReport {
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

enum ReplayOutcome {
    Created(String),
    Updated,
    Deleted,
}

/// Keeps the local journal consistent with the remote mirror under
/// intermittent connectivity.
///
/// Local writes never wait on or fail because of the network. The current
/// collection is published through a [`watch`] channel; see
/// [`JournalSyncService::subscribe`].
pub struct JournalSyncService {
    inner: Arc<SyncInner>,
    connectivity_task: StdMutex<Option<JoinHandle<()>>>,
}

struct SyncInner {
    journal: LocalJournal,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    /// Last connectivity state acted upon, for transition detection
    online: AtomicBool,
    /// Serializes load/mutate/persist sequences on the local blobs. Holds the
    /// ids deleted in this session so late change-feed snapshots cannot
    /// bring them back.
    write_lock: Mutex<HashSet<EntryId>>,
    /// Serializes remote writes: queue replays plus immediate updates and
    /// deletes. Always taken before `write_lock`, never while holding it.
    replay_lock: Mutex<()>,
    entries: watch::Sender<Vec<JournalEntry>>,
    subscription_task: StdMutex<Option<JoinHandle<()>>>,
}

impl JournalSyncService {
    /// Build the service and bring it up.
    ///
    /// The local collection is published before any network access. When
    /// online, the remote collection is merged in and the change feed opened.
    /// Fails only when the local collection cannot be read.
    pub async fn start(
        local: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Result<Self> {
        let mut connectivity_rx = connectivity.watch();
        let online = *connectivity_rx.borrow_and_update();
        let (entries, _) = watch::channel(Vec::new());

        let inner = Arc::new(SyncInner {
            journal: LocalJournal::new(local),
            remote,
            connectivity,
            online: AtomicBool::new(online),
            write_lock: Mutex::new(HashSet::new()),
            replay_lock: Mutex::new(()),
            entries,
            subscription_task: StdMutex::new(None),
        });

        let local_entries = inner.journal.load_entries().await?;
        tracing::debug!("Loaded {} journal entries from local storage", local_entries.len());
        inner.publish(local_entries);

        if online {
            inner.come_online().await;
        } else {
            tracing::info!("Starting journal sync offline; remote fetch deferred");
        }

        let listener = tokio::spawn(watch_connectivity(Arc::downgrade(&inner), connectivity_rx));

        Ok(Self {
            inner,
            connectivity_task: StdMutex::new(Some(listener)),
        })
    }

    /// Current connectivity as reported by the monitor
    pub fn is_online(&self) -> bool {
        self.inner.is_online()
    }

    /// Snapshot of the current collection, newest first
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.inner.entries.borrow().clone()
    }

    /// Observe the current collection; the receiver sees every republish
    pub fn subscribe(&self) -> watch::Receiver<Vec<JournalEntry>> {
        self.inner.entries.subscribe()
    }

    pub fn find_entry(&self, id: &EntryId) -> Option<JournalEntry> {
        self.inner
            .entries
            .borrow()
            .iter()
            .find(|entry| &entry.id == id)
            .cloned()
    }

    /// Records waiting for remote reconciliation
    pub async fn pending_entries(&self) -> Result<Vec<JournalEntry>> {
        let _guard = self.inner.write_lock.lock().await;
        self.inner.journal.load_queue().await
    }

    /// Save a new entry.
    ///
    /// Uploads immediately when online. Remote failures leave the entry in
    /// `error` state and queued for replay; only local storage faults fail the call.
    pub async fn add_entry(&self, draft: EntryDraft) -> Result<JournalEntry> {
        validate_text(&draft.text)?;

        let inner = &self.inner;
        let online = inner.is_online();
        let status = if online {
            SyncStatus::Synced
        } else {
            SyncStatus::Pending
        };
        let mut entry = JournalEntry::from_draft(draft, status);

        if online {
            match inner
                .remote
                .create(JOURNAL_COLLECTION, entry_to_document(&entry))
                .await
            {
                Ok(remote_id) => {
                    entry.remote_id = Some(remote_id);
                    entry.sync_status = SyncStatus::Synced;
                }
                Err(error) => {
                    tracing::warn!("Remote create failed for entry {}: {error}", entry.id);
                    entry.sync_status = SyncStatus::Error;
                }
            }
        }

        let _guard = inner.write_lock.lock().await;
        let mut entries = inner.journal.load_entries().await?;
        if entry.sync_status.is_unsynced() {
            inner.journal.enqueue(entry.clone()).await?;
        }
        // the change feed may have delivered our own upload already
        match entries.iter_mut().find(|candidate| candidate.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        inner.journal.save_entries(&mut entries).await?;
        inner.publish(entries);

        tracing::debug!("Added entry {} ({})", entry.id, entry.sync_status);
        Ok(entry)
    }

    /// Replace the text, mood and tags of an existing entry.
    ///
    /// Identity fields (`id`, `remote_id`, `date`) are taken from the stored
    /// entry. Fails with [`Error::NotFound`] for unknown ids.
    pub async fn update_entry(&self, entry: JournalEntry) -> Result<JournalEntry> {
        validate_text(&entry.text)?;

        let inner = &self.inner;
        let stored = {
            let _guard = inner.write_lock.lock().await;
            find_by_id(&inner.journal.load_entries().await?, &entry.id)?
        };

        let mut updated = JournalEntry {
            text: entry.text,
            mood: entry.mood,
            tags: entry.tags,
            last_modified: Some(unix_millis_now()),
            sync_status: SyncStatus::Pending,
            marked_for_deletion: None,
            ..stored
        };

        // held until the queue reflects the outcome so a replay cannot push
        // an older queued copy over this write
        let _remote_guard = match updated.remote_id.clone() {
            Some(remote_id) if inner.is_online() => {
                let guard = inner.replay_lock.lock().await;
                updated.sync_status = match inner
                    .remote
                    .update(JOURNAL_COLLECTION, &remote_id, entry_to_document(&updated))
                    .await
                {
                    Ok(()) => SyncStatus::Synced,
                    Err(error) => {
                        tracing::warn!("Remote update failed for entry {}: {error}", updated.id);
                        SyncStatus::Error
                    }
                };
                Some(guard)
            }
            _ => None,
        };

        let _guard = inner.write_lock.lock().await;
        let mut entries = inner.journal.load_entries().await?;
        let slot = entries
            .iter_mut()
            .find(|candidate| candidate.id == updated.id)
            .ok_or_else(|| Error::NotFound(updated.id.to_string()))?;
        // a replay may have assigned the remote id while we were away
        if updated.remote_id.is_none() {
            updated.remote_id.clone_from(&slot.remote_id);
        }
        *slot = updated.clone();

        if updated.sync_status.is_unsynced() {
            inner.journal.enqueue(updated.clone()).await?;
        } else {
            inner.journal.dequeue(&updated.id).await?;
        }
        inner.journal.save_entries(&mut entries).await?;
        inner.publish(entries);

        tracing::debug!("Updated entry {} ({})", updated.id, updated.sync_status);
        Ok(updated)
    }

    /// Delete an entry locally, then remotely when possible.
    ///
    /// The deletion intent is queued together with the local removal and
    /// dropped once the remote delete succeeds. Fails with
    /// [`Error::NotFound`] for unknown ids.
    pub async fn delete_entry(&self, id: &EntryId) -> Result<()> {
        let inner = &self.inner;
        let intent = {
            let mut deleted = inner.write_lock.lock().await;
            let mut entries = inner.journal.load_entries().await?;
            let position = entries
                .iter()
                .position(|entry| &entry.id == id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            let removed = entries.remove(position);

            let intent = removed.remote_id.is_some().then(|| JournalEntry {
                sync_status: SyncStatus::Pending,
                marked_for_deletion: Some(true),
                ..removed
            });
            match &intent {
                Some(intent) => inner.journal.enqueue(intent.clone()).await?,
                None => inner.journal.dequeue(id).await?,
            }
            inner.journal.save_entries(&mut entries).await?;
            deleted.insert(id.clone());
            inner.publish(entries);
            intent
        };

        let Some(intent) = intent else {
            tracing::debug!("Deleted never-uploaded entry {id}");
            return Ok(());
        };
        let Some(remote_id) = intent.remote_id.as_deref() else {
            return Ok(());
        };
        if !inner.is_online() {
            tracing::debug!("Deleted entry {id} locally; remote delete queued");
            return Ok(());
        }

        let _remote_guard = inner.replay_lock.lock().await;
        match inner.remote.delete(JOURNAL_COLLECTION, remote_id).await {
            Ok(()) | Err(Error::NotFound(_)) => {
                let _guard = inner.write_lock.lock().await;
                inner.journal.dequeue_record(&intent).await?;
                tracing::debug!("Deleted entry {id} (remote {remote_id})");
            }
            Err(error) => {
                tracing::warn!("Remote delete failed for entry {id}: {error}; left queued");
            }
        }
        Ok(())
    }

    /// Replay the pending queue against the remote store.
    ///
    /// Does nothing while offline. Each record is attempted independently;
    /// failures stay queued for the next pass.
    pub async fn sync_pending_entries(&self) -> Result<SyncReport> {
        self.inner.sync_pending().await
    }

    /// Stop background work: the connectivity listener and the remote change feed
    pub fn shutdown(&self) {
        if let Ok(mut task) = self.connectivity_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
        self.inner.replace_subscription(None);
    }
}

impl Drop for JournalSyncService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl SyncInner {
    fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    fn publish(&self, entries: Vec<JournalEntry>) {
        self.entries.send_replace(entries);
    }

    /// Replay, refresh from the remote collection and (re)open the change feed
    async fn come_online(self: &Arc<Self>) {
        match self.sync_pending().await {
            Ok(report) if report.synced + report.failed > 0 => {
                tracing::info!(
                    "Replayed pending journal changes: {} synced, {} failed",
                    report.synced,
                    report.failed
                );
            }
            Ok(_) => {}
            Err(error) => tracing::warn!("Pending journal replay failed: {error}"),
        }

        match self
            .remote
            .query(JOURNAL_COLLECTION, ORDER_FIELD, SortDirection::Descending)
            .await
        {
            Ok(documents) => {
                if let Err(error) = self.apply_remote_snapshot(documents).await {
                    tracing::warn!("Failed to merge remote journal: {error}");
                }
            }
            Err(error) => tracing::warn!("Failed to fetch remote journal: {error}"),
        }

        self.open_subscription().await;
    }

    async fn open_subscription(self: &Arc<Self>) {
        let mut subscription = match self
            .remote
            .subscribe(JOURNAL_COLLECTION, ORDER_FIELD, SortDirection::Descending)
            .await
        {
            Ok(subscription) => subscription,
            Err(error) => {
                tracing::warn!("Failed to subscribe to remote journal changes: {error}");
                return;
            }
        };

        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            while let Some(documents) = subscription.next().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if !inner.is_online() {
                    tracing::debug!("Ignoring remote journal change received while offline");
                    continue;
                }
                if let Err(error) = inner.apply_remote_snapshot(documents).await {
                    tracing::warn!("Failed to apply remote journal change: {error}");
                }
            }
        });
        self.replace_subscription(Some(task));
    }

    fn replace_subscription(&self, task: Option<JoinHandle<()>>) {
        if let Ok(mut current) = self.subscription_task.lock() {
            if let Some(previous) = std::mem::replace(&mut *current, task) {
                previous.abort();
            }
        }
    }

    async fn apply_remote_snapshot(&self, documents: Vec<RemoteDocument>) -> Result<()> {
        let remote_entries: Vec<JournalEntry> =
            documents.iter().filter_map(entry_from_document).collect();

        let deleted = self.write_lock.lock().await;
        let local_entries = self.journal.load_entries().await?;
        let queue = self.journal.load_queue().await?;
        let remote_entries = remote_entries
            .into_iter()
            .filter(|entry| !is_deleted_locally(entry, &deleted, &queue))
            .collect();
        let mut merged = merge_entries(local_entries, remote_entries);
        self.journal.save_entries(&mut merged).await?;
        self.publish(merged);
        Ok(())
    }

    async fn sync_pending(&self) -> Result<SyncReport> {
        if !self.is_online() {
            tracing::debug!("Offline; skipping pending journal replay");
            return Ok(SyncReport::default());
        }

        let _replay = self.replay_lock.lock().await;
        let queue = {
            let _guard = self.write_lock.lock().await;
            self.journal.load_queue().await?
        };
        if queue.is_empty() {
            return Ok(SyncReport::default());
        }

        let mut outcomes = Vec::with_capacity(queue.len());
        for record in queue {
            let outcome = self.replay_record(&record).await;
            outcomes.push((record, outcome));
        }

        let mut report = SyncReport::default();
        let _guard = self.write_lock.lock().await;
        let mut entries = self.journal.load_entries().await?;
        let mut pending = self.journal.load_queue().await?;

        for (record, outcome) in outcomes {
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::warn!("Replay failed for entry {}: {error}", record.id);
                    report.failed += 1;
                    continue;
                }
            };
            report.synced += 1;

            // a newer snapshot queued during the replay must survive
            if let Some(position) = pending.iter().position(|queued| queued == &record) {
                pending.remove(position);
            }

            match outcome {
                ReplayOutcome::Deleted => {}
                ReplayOutcome::Created(remote_id) => {
                    for queued in pending
                        .iter_mut()
                        .filter(|queued| queued.id == record.id && queued.remote_id.is_none())
                    {
                        queued.remote_id = Some(remote_id.clone());
                    }

                    let still_local = entries.iter_mut().find(|entry| entry.id == record.id);
                    if let Some(entry) = still_local {
                        entry.remote_id = Some(remote_id);
                    } else if !pending.iter().any(|queued| queued.id == record.id) {
                        tracing::debug!(
                            "Entry {} was deleted during replay; queueing remote delete",
                            record.id
                        );
                        pending.push(JournalEntry {
                            remote_id: Some(remote_id),
                            sync_status: SyncStatus::Pending,
                            marked_for_deletion: Some(true),
                            ..record.clone()
                        });
                    }
                }
                ReplayOutcome::Updated => {}
            }

            if !pending.iter().any(|queued| queued.id == record.id) {
                if let Some(entry) = entries.iter_mut().find(|entry| entry.id == record.id) {
                    entry.sync_status = SyncStatus::Synced;
                }
            }
        }

        self.journal.save_queue(&pending).await?;
        self.journal.save_entries(&mut entries).await?;
        self.publish(entries);
        Ok(report)
    }

    async fn replay_record(&self, record: &JournalEntry) -> Result<ReplayOutcome> {
        if record.is_deletion_intent() {
            let Some(remote_id) = record.remote_id.as_deref() else {
                return Ok(ReplayOutcome::Deleted);
            };
            return match self.remote.delete(JOURNAL_COLLECTION, remote_id).await {
                Ok(()) | Err(Error::NotFound(_)) => Ok(ReplayOutcome::Deleted),
                Err(error) => Err(error),
            };
        }

        let document = entry_to_document(record);
        match record.remote_id.as_deref() {
            Some(remote_id) => {
                match self
                    .remote
                    .update(JOURNAL_COLLECTION, remote_id, document.clone())
                    .await
                {
                    Ok(()) => Ok(ReplayOutcome::Updated),
                    // deleted on another device; the local edit wins and recreates it
                    Err(Error::NotFound(_)) => self
                        .remote
                        .create(JOURNAL_COLLECTION, document)
                        .await
                        .map(ReplayOutcome::Created),
                    Err(error) => Err(error),
                }
            }
            None => self
                .remote
                .create(JOURNAL_COLLECTION, document)
                .await
                .map(ReplayOutcome::Created),
        }
    }
}

impl Drop for SyncInner {
    fn drop(&mut self) {
        self.replace_subscription(None);
    }
}

async fn watch_connectivity(inner: Weak<SyncInner>, mut connectivity: watch::Receiver<bool>) {
    while connectivity.changed().await.is_ok() {
        let online = *connectivity.borrow_and_update();
        let Some(inner) = inner.upgrade() else {
            break;
        };

        let was_online = inner.online.swap(online, Ordering::SeqCst);
        match (was_online, online) {
            (false, true) => {
                tracing::info!("Back online; replaying pending journal changes");
                inner.come_online().await;
            }
            (true, false) => {
                tracing::info!("Offline; pausing remote journal change feed");
                inner.replace_subscription(None);
            }
            _ => {}
        }
    }
}

/// Whether `entry` was deleted here, either in this session or by a
/// deletion intent still waiting in the queue
fn is_deleted_locally(
    entry: &JournalEntry,
    deleted: &HashSet<EntryId>,
    queue: &[JournalEntry],
) -> bool {
    deleted.contains(&entry.id)
        || queue.iter().any(|record| {
            record.is_deletion_intent()
                && (record.id == entry.id
                    || (record.remote_id.is_some() && record.remote_id == entry.remote_id))
        })
}

fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidInput(
            "journal entry text cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn find_by_id(entries: &[JournalEntry], id: &EntryId) -> Result<JournalEntry> {
    entries
        .iter()
        .find(|entry| &entry.id == id)
        .cloned()
        .ok_or_else(|| Error::NotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityHandle;
    use crate::test_support::{eventually, MemoryKeyValueStore, MemoryRemoteStore};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    /// Collection and queue invariants that must hold once work has settled
    async fn assert_consistent(service: &JournalSyncService) {
        let entries = service.entries();
        let queue = service.pending_entries().await.unwrap();

        let ids: HashSet<&EntryId> = entries.iter().map(|entry| &entry.id).collect();
        assert_eq!(ids.len(), entries.len(), "duplicate entry ids");

        let remote_ids: Vec<&str> = entries
            .iter()
            .filter_map(|entry| entry.remote_id.as_deref())
            .collect();
        let unique_remote_ids: HashSet<&str> = remote_ids.iter().copied().collect();
        assert_eq!(
            unique_remote_ids.len(),
            remote_ids.len(),
            "duplicate remote ids"
        );

        let queued: HashSet<&EntryId> = queue.iter().map(|record| &record.id).collect();
        assert_eq!(queued.len(), queue.len(), "more than one record per entry");

        for entry in entries.iter().filter(|entry| entry.sync_status.is_unsynced()) {
            assert!(queued.contains(&entry.id), "unsynced entry {} not queued", entry.id);
        }
        for record in queue.iter().filter(|record| !record.is_deletion_intent()) {
            assert!(
                entries
                    .iter()
                    .any(|entry| entry.id == record.id && entry.sync_status.is_unsynced()),
                "queued record {} has no unsynced entry",
                record.id
            );
        }
    }

    struct Harness {
        store: Arc<MemoryKeyValueStore>,
        remote: Arc<MemoryRemoteStore>,
        connectivity: ConnectivityHandle,
    }

    impl Harness {
        fn new(online: bool) -> Self {
            Self {
                store: Arc::new(MemoryKeyValueStore::default()),
                remote: Arc::new(MemoryRemoteStore::default()),
                connectivity: ConnectivityHandle::new(online),
            }
        }

        async fn start(&self) -> JournalSyncService {
            JournalSyncService::start(
                self.store.clone(),
                self.remote.clone(),
                Arc::new(self.connectivity.clone()),
            )
            .await
            .unwrap()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_add_is_pending_and_queued() {
        let harness = Harness::new(false);
        let service = harness.start().await;

        let entry = service
            .add_entry(EntryDraft::new("Felt calm today").with_mood("Calm"))
            .await
            .unwrap();

        assert_eq!(entry.sync_status, SyncStatus::Pending);
        assert_eq!(entry.remote_id, None);
        assert_eq!(service.entries(), vec![entry.clone()]);
        assert_eq!(service.pending_entries().await.unwrap(), vec![entry]);
        assert_eq!(harness.remote.creates(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reconnect_replays_queued_add_exactly_once() {
        let harness = Harness::new(false);
        let service = harness.start().await;
        let entry = service
            .add_entry(EntryDraft::new("Felt calm today"))
            .await
            .unwrap();

        harness.connectivity.set_online(true);
        assert!(
            eventually(|| service
                .find_entry(&entry.id)
                .is_some_and(|e| e.sync_status == SyncStatus::Synced))
            .await
        );

        // a second pass finds nothing left to do
        assert_eq!(
            service.sync_pending_entries().await.unwrap(),
            SyncReport::default()
        );
        assert_eq!(harness.remote.creates(), 1);
        assert_eq!(harness.remote.len(), 1);
        assert!(service.pending_entries().await.unwrap().is_empty());

        let synced = service.find_entry(&entry.id).unwrap();
        assert_eq!(synced.remote_id.as_deref(), Some("remote-1"));
        assert_eq!(service.entries().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_delete_of_synced_entry_replays_one_delete() {
        let harness = Harness::new(true);
        let service = harness.start().await;
        let entry = service.add_entry(EntryDraft::new("uploaded")).await.unwrap();
        assert_eq!(entry.sync_status, SyncStatus::Synced);
        assert_eq!(harness.remote.len(), 1);

        harness.connectivity.set_online(false);
        service.delete_entry(&entry.id).await.unwrap();

        assert!(service.entries().is_empty());
        let queue = service.pending_entries().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert!(queue[0].is_deletion_intent());
        assert_eq!(queue[0].remote_id, entry.remote_id);
        assert_eq!(harness.remote.deletes(), 0);

        harness.connectivity.set_online(true);
        assert!(eventually(|| harness.remote.len() == 0).await);
        service.sync_pending_entries().await.unwrap();

        assert_eq!(harness.remote.deletes(), 1);
        assert!(service.pending_entries().await.unwrap().is_empty());
        assert!(service.entries().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleting_never_uploaded_entry_needs_no_remote_call() {
        let harness = Harness::new(false);
        let service = harness.start().await;
        let entry = service.add_entry(EntryDraft::new("draft")).await.unwrap();

        service.delete_entry(&entry.id).await.unwrap();
        assert!(service.pending_entries().await.unwrap().is_empty());

        harness.connectivity.set_online(true);
        let report = service.sync_pending_entries().await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert_eq!(harness.remote.creates(), 0);
        assert_eq!(harness.remote.deletes(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_text_is_rejected() {
        let harness = Harness::new(true);
        let service = harness.start().await;

        let result = service.add_entry(EntryDraft::new("   \n")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(service.entries().is_empty());
        assert_eq!(harness.remote.creates(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_failure_marks_error_without_failing_the_call() {
        let harness = Harness::new(true);
        let service = harness.start().await;
        harness.remote.set_failing(true);

        let entry = service.add_entry(EntryDraft::new("flaky")).await.unwrap();
        assert_eq!(entry.sync_status, SyncStatus::Error);
        assert_eq!(service.pending_entries().await.unwrap().len(), 1);

        let report = service.sync_pending_entries().await.unwrap();
        assert_eq!(report, SyncReport { synced: 0, failed: 1 });
        assert!(!report.is_clean());

        harness.remote.set_failing(false);
        let report = service.sync_pending_entries().await.unwrap();
        assert_eq!(report, SyncReport { synced: 1, failed: 0 });

        let synced = service.find_entry(&entry.id).unwrap();
        assert_eq!(synced.sync_status, SyncStatus::Synced);
        assert!(synced.remote_id.is_some());
        assert_eq!(harness.remote.creates(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_while_offline_is_a_no_op() {
        let harness = Harness::new(false);
        let service = harness.start().await;
        service.add_entry(EntryDraft::new("later")).await.unwrap();

        let report = service.sync_pending_entries().await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert_eq!(service.pending_entries().await.unwrap().len(), 1);
        assert_eq!(harness.remote.creates(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_edits_collapse_into_one_queued_record() {
        let harness = Harness::new(false);
        let service = harness.start().await;
        let entry = service.add_entry(EntryDraft::new("first")).await.unwrap();

        let mut edit = entry.clone();
        edit.text = "second".to_string();
        edit.tags = Some(vec!["gratitude".to_string()]);
        let updated = service.update_entry(edit).await.unwrap();

        assert_eq!(updated.date, entry.date);
        assert_eq!(updated.sync_status, SyncStatus::Pending);
        let queue = service.pending_entries().await.unwrap();
        assert_eq!(queue, vec![updated]);

        harness.connectivity.set_online(true);
        assert!(eventually(|| harness.remote.len() == 1).await);
        service.sync_pending_entries().await.unwrap();
        assert_eq!(harness.remote.creates(), 1);
        assert_eq!(harness.remote.updates(), 0);

        let document = harness.remote.document("remote-1").unwrap();
        assert_eq!(document.data["text"], "second");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn online_update_goes_straight_to_remote() {
        let harness = Harness::new(true);
        let service = harness.start().await;
        let entry = service.add_entry(EntryDraft::new("before")).await.unwrap();

        let mut edit = entry.clone();
        edit.text = "after".to_string();
        let updated = service.update_entry(edit).await.unwrap();

        assert_eq!(updated.sync_status, SyncStatus::Synced);
        assert_eq!(harness.remote.updates(), 1);
        assert!(service.pending_entries().await.unwrap().is_empty());
        assert_eq!(
            harness.remote.document("remote-1").unwrap().data["text"],
            "after"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_ids_are_not_found() {
        let harness = Harness::new(true);
        let service = harness.start().await;
        let ghost = JournalEntry::from_draft(EntryDraft::new("ghost"), SyncStatus::Synced);

        assert!(matches!(
            service.update_entry(ghost.clone()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.delete_entry(&ghost.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_merges_remote_collection() {
        let harness = Harness::new(true);
        let tablet = JournalEntry::from_draft(EntryDraft::new("from tablet"), SyncStatus::Synced);
        harness
            .remote
            .insert_external("doc-9", entry_to_document(&tablet));

        let service = harness.start().await;
        let entries = service.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, tablet.id);
        assert_eq!(entries[0].remote_id.as_deref(), Some("doc-9"));
        assert_eq!(entries[0].text, "from tablet");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_changes_arrive_through_subscription() {
        let harness = Harness::new(true);
        let service = harness.start().await;
        let mut updates = service.subscribe();
        assert!(eventually(|| harness.remote.subscriber_count() == 1).await);

        let phone = JournalEntry::from_draft(EntryDraft::new("from phone"), SyncStatus::Synced);
        harness
            .remote
            .insert_external("doc-1", entry_to_document(&phone));
        harness.remote.notify().await;

        updates.changed().await.unwrap();
        assert!(eventually(|| service.find_entry(&phone.id).is_some()).await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_changes_ignored_while_offline() {
        let harness = Harness::new(true);
        let service = harness.start().await;
        assert!(eventually(|| harness.remote.subscriber_count() == 1).await);

        harness.connectivity.set_online(false);
        assert!(eventually(|| harness.remote.subscriber_count() == 0).await);

        let phone = JournalEntry::from_draft(EntryDraft::new("from phone"), SyncStatus::Synced);
        harness
            .remote
            .insert_external("doc-1", entry_to_document(&phone));
        harness.remote.notify().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(service.entries().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_storage_failure_surfaces() {
        let harness = Harness::new(false);
        let service = harness.start().await;
        harness.store.set_fail_writes(true);

        let result = service.add_entry(EntryDraft::new("lost?")).await;
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_restores_collection_and_queue() {
        let harness = Harness::new(false);
        let entry = {
            let service = harness.start().await;
            service.add_entry(EntryDraft::new("persisted")).await.unwrap()
        };

        let service = harness.start().await;
        assert_eq!(service.entries(), vec![entry.clone()]);
        assert_eq!(service.pending_entries().await.unwrap(), vec![entry]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn change_feed_delivering_own_upload_keeps_one_entry() {
        let harness = Harness::new(true);
        let service = harness.start().await;
        assert!(eventually(|| harness.remote.subscriber_count() == 1).await);
        harness.remote.set_write_pause(Duration::from_millis(100));

        let entry = service.add_entry(EntryDraft::new("hello")).await.unwrap();

        assert_eq!(service.entries(), vec![entry.clone()]);
        assert_eq!(entry.remote_id.as_deref(), Some("remote-1"));
        assert_consistent(&service).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn change_feed_during_delete_does_not_resurrect_entry() {
        let harness = Harness::new(true);
        let service = harness.start().await;
        let entry = service.add_entry(EntryDraft::new("bye")).await.unwrap();
        assert!(eventually(|| harness.remote.subscriber_count() == 1).await);
        harness.remote.set_write_pause(Duration::from_millis(100));

        service.delete_entry(&entry.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(harness.remote.len(), 0);
        assert_eq!(harness.remote.deletes(), 1);
        assert!(service.entries().is_empty());
        assert!(service.pending_entries().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_snapshot_after_delete_is_ignored() {
        let harness = Harness::new(true);
        let service = harness.start().await;
        let entry = service.add_entry(EntryDraft::new("gone")).await.unwrap();
        assert!(eventually(|| harness.remote.subscriber_count() == 1).await);
        let before_delete = harness.remote.snapshot();

        service.delete_entry(&entry.id).await.unwrap();
        harness.remote.deliver(before_delete).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(service.entries().is_empty());
        assert_consistent(&service).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn queued_deletion_hides_remote_copy_until_replayed() {
        let harness = Harness::new(true);
        let service = harness.start().await;
        let entry = service.add_entry(EntryDraft::new("offline delete")).await.unwrap();
        assert!(eventually(|| harness.remote.subscriber_count() == 1).await);

        harness.remote.set_failing(true);
        service.delete_entry(&entry.id).await.unwrap();
        assert_eq!(service.pending_entries().await.unwrap().len(), 1);

        harness.remote.set_failing(false);
        harness.remote.notify().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(service.entries().is_empty());

        let report = service.sync_pending_entries().await.unwrap();
        assert_eq!(report, SyncReport { synced: 1, failed: 0 });
        assert_eq!(harness.remote.len(), 0);
        assert_consistent(&service).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_adds_replay_and_change_feed_stay_consistent() {
        let harness = Harness::new(false);
        let service = Arc::new(harness.start().await);
        for index in 0..5 {
            service
                .add_entry(EntryDraft::new(format!("offline {index}")))
                .await
                .unwrap();
        }
        harness.connectivity.set_online(true);

        let mut tasks = Vec::new();
        for index in 0..5 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service
                    .add_entry(EntryDraft::new(format!("online {index}")))
                    .await
                    .map(|_| ())
            }));
        }
        for _ in 0..3 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service.sync_pending_entries().await.map(|_| ())
            }));
        }
        let remote = harness.remote.clone();
        let feed = tokio::spawn(async move {
            for _ in 0..5 {
                remote.notify().await;
                tokio::task::yield_now().await;
            }
        });
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        feed.await.unwrap();

        assert!(
            eventually(|| service
                .entries()
                .iter()
                .all(|entry| entry.sync_status == SyncStatus::Synced))
            .await
        );
        service.sync_pending_entries().await.unwrap();

        assert_eq!(service.entries().len(), 10);
        assert_eq!(harness.remote.len(), 10);
        assert_eq!(harness.remote.creates(), 10);
        assert!(service.pending_entries().await.unwrap().is_empty());
        assert_consistent(&service).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_deletes_replay_and_change_feed_stay_deleted() {
        let harness = Harness::new(true);
        let service = Arc::new(harness.start().await);
        let mut doomed = Vec::new();
        for index in 0..4 {
            let entry = service
                .add_entry(EntryDraft::new(format!("doomed {index}")))
                .await
                .unwrap();
            doomed.push(entry.id);
        }
        let keeper = service.add_entry(EntryDraft::new("keeper")).await.unwrap();
        assert!(eventually(|| harness.remote.subscriber_count() == 1).await);
        harness.remote.set_write_pause(Duration::from_millis(20));

        let mut tasks = Vec::new();
        for id in doomed {
            let service = service.clone();
            tasks.push(tokio::spawn(async move { service.delete_entry(&id).await }));
        }
        for _ in 0..2 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service.sync_pending_entries().await.map(|_| ())
            }));
        }
        let remote = harness.remote.clone();
        let feed = tokio::spawn(async move {
            for _ in 0..5 {
                remote.notify().await;
                tokio::task::yield_now().await;
            }
        });
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        feed.await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let ids: Vec<EntryId> = service.entries().into_iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![keeper.id]);
        assert_eq!(harness.remote.len(), 1);
        assert!(service.pending_entries().await.unwrap().is_empty());
        assert_consistent(&service).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn updates_racing_reconnect_replay_end_with_latest_text() {
        let harness = Harness::new(false);
        let service = harness.start().await;
        let entry = service.add_entry(EntryDraft::new("v0")).await.unwrap();

        harness.connectivity.set_online(true);
        let mut latest = entry.clone();
        for version in 1..=5 {
            let mut edit = latest.clone();
            edit.text = format!("v{version}");
            latest = service.update_entry(edit).await.unwrap();
        }
        service.sync_pending_entries().await.unwrap();

        assert!(
            eventually(|| service
                .find_entry(&entry.id)
                .is_some_and(|e| e.sync_status == SyncStatus::Synced))
            .await
        );
        assert_eq!(harness.remote.creates(), 1);
        assert_eq!(harness.remote.len(), 1);

        let remote_id = service.find_entry(&entry.id).unwrap().remote_id.unwrap();
        assert_eq!(harness.remote.document(&remote_id).unwrap().data["text"], "v5");
        assert_consistent(&service).await;
    }
}
