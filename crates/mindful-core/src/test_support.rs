//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::remote::{RemoteDocument, RemoteStore, RemoteSubscription, SortDirection};
use crate::storage::KeyValueStore;
use crate::{Error, Result};

#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database("disk full".to_string()));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database("disk full".to_string()));
        }
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Remote store with call counters, failure injection and manual notifications
#[derive(Default)]
pub struct MemoryRemoteStore {
    documents: Mutex<BTreeMap<String, RemoteDocument>>,
    subscribers: Mutex<Vec<mpsc::Sender<Vec<RemoteDocument>>>>,
    next_id: AtomicUsize,
    clock: AtomicUsize,
    failing: AtomicBool,
    write_pause_ms: AtomicU64,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Announce every create or delete to subscribers and stall before the
    /// call returns. Creates announce the new document; deletes announce the
    /// snapshot that still holds the document, then remove it.
    pub fn set_write_pause(&self, pause: Duration) {
        let millis = u64::try_from(pause.as_millis()).unwrap();
        self.write_pause_ms.store(millis, Ordering::SeqCst);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn document(&self, id: &str) -> Option<RemoteDocument> {
        self.documents.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    /// Insert a document as if another device had written it
    pub fn insert_external(&self, id: &str, data: serde_json::Value) {
        let updated_at = self.tick();
        self.documents.lock().unwrap().insert(
            id.to_string(),
            RemoteDocument {
                id: id.to_string(),
                data,
                updated_at,
            },
        );
    }

    /// Push the current snapshot to every live subscriber
    pub async fn notify(&self) {
        self.deliver(self.snapshot()).await;
    }

    /// Push an arbitrary, possibly stale, snapshot to every live subscriber
    pub async fn deliver(&self, snapshot: Vec<RemoteDocument>) {
        let subscribers = self.subscribers.lock().unwrap().clone();
        for subscriber in subscribers {
            let _ = subscriber.send(snapshot.clone()).await;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|sender| !sender.is_closed());
        subscribers.len()
    }

    pub fn snapshot(&self) -> Vec<RemoteDocument> {
        self.documents.lock().unwrap().values().cloned().collect()
    }

    fn tick(&self) -> i64 {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        i64::try_from(tick).unwrap()
    }

    async fn announce_and_pause(&self) {
        let pause = self.write_pause_ms.load(Ordering::SeqCst);
        if pause > 0 {
            self.notify().await;
            tokio::time::sleep(Duration::from_millis(pause)).await;
        }
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::Remote("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn create(&self, _collection: &str, data: serde_json::Value) -> Result<String> {
        self.check()?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        let id = format!("remote-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.insert_external(&id, data);
        self.announce_and_pause().await;
        Ok(id)
    }

    async fn update(&self, _collection: &str, id: &str, data: serde_json::Value) -> Result<()> {
        self.check()?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        let updated_at = self.tick();
        let mut documents = self.documents.lock().unwrap();
        let document = documents
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        document.data = data;
        document.updated_at = updated_at;
        Ok(())
    }

    async fn delete(&self, _collection: &str, id: &str) -> Result<()> {
        self.check()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.announce_and_pause().await;
        self.documents
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn query(
        &self,
        _collection: &str,
        _order_by: &str,
        _direction: SortDirection,
    ) -> Result<Vec<RemoteDocument>> {
        self.check()?;
        Ok(self.snapshot())
    }

    async fn subscribe(
        &self,
        _collection: &str,
        _order_by: &str,
        _direction: SortDirection,
    ) -> Result<RemoteSubscription> {
        self.check()?;
        let (sender, receiver) = mpsc::channel(16);
        self.subscribers.lock().unwrap().push(sender);
        Ok(RemoteSubscription::new(receiver, None))
    }
}

/// Poll `condition` until it holds or a few seconds pass
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
