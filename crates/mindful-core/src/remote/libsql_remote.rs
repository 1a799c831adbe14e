//! Document store on a libSQL database, typically a remote Turso instance

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::{RemoteDocument, RemoteStore, RemoteSubscription, SortDirection};
use crate::db::{Database, RemoteConfig};
use crate::error::{Error, Result};

const SUBSCRIPTION_BUFFER: usize = 16;

/// [`RemoteStore`] persisted in the `documents` table.
///
/// Subscriptions poll the per-collection revision counter and re-run the
/// query whenever it moves.
#[derive(Clone)]
pub struct LibSqlRemoteStore {
    db: Arc<Mutex<Database>>,
    poll_interval: Duration,
}

impl LibSqlRemoteStore {
    /// Connect to the configured remote database
    pub async fn connect(config: &RemoteConfig) -> Result<Self> {
        let db = Database::open_remote(config).await?;
        tracing::info!(
            "Remote document store connected: {}",
            config.url.as_deref().unwrap_or("unknown")
        );
        Ok(Self::new(db, config.poll_interval()))
    }

    /// Use a database file as the document store (shared folders, tests)
    pub async fn open_path(path: impl AsRef<Path>, poll_interval: Duration) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?, poll_interval))
    }

    /// Open an in-memory document store (primarily for tests)
    pub async fn open_in_memory(poll_interval: Duration) -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?, poll_interval))
    }

    pub fn new(db: Database, poll_interval: Duration) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            poll_interval,
        }
    }

    /// Current change counter of a collection (0 when never written)
    pub async fn revision(&self, collection: &str) -> Result<i64> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT revision FROM collection_revisions WHERE collection = ?1",
                libsql::params![collection],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    async fn bump_revision(db: &Database, collection: &str) -> Result<()> {
        db.connection()
            .execute(
                "INSERT INTO collection_revisions (collection, revision) VALUES (?1, 1)
                 ON CONFLICT(collection) DO UPDATE SET revision = revision + 1",
                libsql::params![collection],
            )
            .await?;
        Ok(())
    }

    /// Commit or roll back the transaction opened by a write
    async fn finish<T>(db: &Database, result: Result<T>) -> Result<T> {
        let conn = db.connection();
        match result {
            Ok(value) => {
                if let Err(error) = conn.execute("COMMIT", ()).await {
                    conn.execute("ROLLBACK", ()).await.ok();
                    return Err(error.into());
                }
                Ok(value)
            }
            Err(error) => {
                conn.execute("ROLLBACK", ()).await.ok();
                Err(error)
            }
        }
    }
}

fn validate_collection(collection: &str) -> Result<()> {
    if collection.trim().is_empty() {
        return Err(Error::InvalidInput("collection name cannot be empty".into()));
    }
    Ok(())
}

/// Build the JSON path for an order-by field, accepting plain identifiers only
fn order_path(order_by: &str) -> Result<String> {
    let valid = !order_by.is_empty()
        && order_by
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(format!("$.{order_by}"))
    } else {
        Err(Error::InvalidInput(format!(
            "invalid order-by field: {order_by}"
        )))
    }
}

#[async_trait]
impl RemoteStore for LibSqlRemoteStore {
    async fn create(&self, collection: &str, data: serde_json::Value) -> Result<String> {
        validate_collection(collection)?;
        let id = Uuid::now_v7().to_string();
        let now = chrono::Utc::now().timestamp_millis();
        let body = serde_json::to_string(&data)?;

        let db = self.db.lock().await;
        db.connection().execute("BEGIN TRANSACTION", ()).await?;
        let result: Result<()> = async {
            db.connection()
                .execute(
                    "INSERT INTO documents (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)",
                    libsql::params![collection, id.as_str(), body, now],
                )
                .await?;
            Self::bump_revision(&db, collection).await
        }
        .await;
        Self::finish(&db, result).await?;

        tracing::debug!("Created remote document {collection}/{id}");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, data: serde_json::Value) -> Result<()> {
        validate_collection(collection)?;
        let now = chrono::Utc::now().timestamp_millis();
        let body = serde_json::to_string(&data)?;

        let db = self.db.lock().await;
        db.connection().execute("BEGIN TRANSACTION", ()).await?;
        let result: Result<()> = async {
            let rows = db
                .connection()
                .execute(
                    "UPDATE documents SET data = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
                    libsql::params![body, now, collection, id],
                )
                .await?;

            if rows == 0 {
                return Err(Error::NotFound(format!("{collection}/{id}")));
            }
            Self::bump_revision(&db, collection).await
        }
        .await;
        Self::finish(&db, result).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        validate_collection(collection)?;

        let db = self.db.lock().await;
        db.connection().execute("BEGIN TRANSACTION", ()).await?;
        let result: Result<()> = async {
            let rows = db
                .connection()
                .execute(
                    "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                    libsql::params![collection, id],
                )
                .await?;

            if rows == 0 {
                return Err(Error::NotFound(format!("{collection}/{id}")));
            }
            Self::bump_revision(&db, collection).await
        }
        .await;
        Self::finish(&db, result).await
    }

    async fn query(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Vec<RemoteDocument>> {
        validate_collection(collection)?;
        let path = order_path(order_by)?;
        let direction = direction.as_sql();
        let sql = format!(
            "SELECT id, data, updated_at FROM documents
             WHERE collection = ?1
             ORDER BY json_extract(data, ?2) {direction}, id {direction}"
        );

        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(&sql, libsql::params![collection, path])
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            let body: String = row.get(1)?;
            documents.push(RemoteDocument {
                id: row.get(0)?,
                data: serde_json::from_str(&body)?,
                updated_at: row.get(2)?,
            });
        }
        Ok(documents)
    }

    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<RemoteSubscription> {
        validate_collection(collection)?;
        order_path(order_by)?;

        let store = self.clone();
        let collection = collection.to_string();
        let order_by = order_by.to_string();
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);

        let task = tokio::spawn(async move {
            let mut last_revision = None;
            let mut ticker = tokio::time::interval(store.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let revision = match store.revision(&collection).await {
                    Ok(revision) => revision,
                    Err(error) => {
                        tracing::warn!("Failed to poll revision of {collection}: {error}");
                        continue;
                    }
                };
                if last_revision == Some(revision) {
                    continue;
                }

                match store.query(&collection, &order_by, direction).await {
                    Ok(documents) => {
                        last_revision = Some(revision);
                        if sender.send(documents).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!("Failed to refresh subscription on {collection}: {error}");
                    }
                }
            }
            tracing::debug!("Remote subscription on {collection} closed");
        });

        Ok(RemoteSubscription::new(receiver, Some(task)))
    }
}
