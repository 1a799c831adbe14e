//! Remote document store abstraction
//!
//! The sync service talks to the cloud only through [`RemoteStore`]: documents
//! are JSON objects addressed by collection and id, listed in order of a data
//! field, with a push-style change feed delivered as whole snapshots.

mod libsql_remote;

pub use libsql_remote::LibSqlRemoteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Collection holding journal documents
pub const JOURNAL_COLLECTION: &str = "journalEntries";

/// A document as stored remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    /// Store-assigned document id
    pub id: String,
    /// Document body
    pub data: serde_json::Value,
    /// Server-assigned timestamp of the last write (Unix ms)
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Live change feed for one collection query.
///
/// Dropping the subscription (or calling [`RemoteSubscription::unsubscribe`])
/// stops the feed.
pub struct RemoteSubscription {
    receiver: mpsc::Receiver<Vec<RemoteDocument>>,
    task: Option<JoinHandle<()>>,
}

impl RemoteSubscription {
    /// Wrap a snapshot channel and the task feeding it, if any
    pub fn new(receiver: mpsc::Receiver<Vec<RemoteDocument>>, task: Option<JoinHandle<()>>) -> Self {
        Self { receiver, task }
    }

    /// Wait for the next snapshot; `None` once the feed has ended
    pub async fn next(&mut self) -> Option<Vec<RemoteDocument>> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.receiver.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RemoteSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Networked document persistence addressed by collection and document id
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a document and return its generated id
    async fn create(&self, collection: &str, data: serde_json::Value) -> Result<String>;

    /// Replace the body of an existing document.
    ///
    /// Fails with [`crate::Error::NotFound`] when the document does not exist.
    async fn update(&self, collection: &str, id: &str, data: serde_json::Value) -> Result<()>;

    /// Delete a document.
    ///
    /// Fails with [`crate::Error::NotFound`] when the document does not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// List every document in `collection` ordered by the `order_by` data field
    async fn query(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Vec<RemoteDocument>>;

    /// Subscribe to snapshots of the same query, starting with the current one
    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<RemoteSubscription>;
}
