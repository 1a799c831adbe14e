//! libSQL-backed key-value store

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::db::Database;
use crate::error::Result;

/// Key-value store persisted in the `kv_store` table
#[derive(Clone)]
pub struct LibSqlKeyValueStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlKeyValueStore {
    /// Open a store at the given filesystem path, creating parent directories.
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }
}

#[async_trait]
impl KeyValueStore for LibSqlKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT value FROM kv_store WHERE key = ?1",
                libsql::params![key],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                libsql::params![key, value, now],
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM kv_store WHERE key = ?1", libsql::params![key])
            .await?;
        Ok(())
    }
}
