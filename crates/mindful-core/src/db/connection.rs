//! Database connection management

use crate::error::{Error, Result};
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;
use std::time::Duration;

use super::migrations;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Configuration for the remote document database
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Remote database URL (e.g., `libsql://your-db.turso.io`)
    pub url: Option<String>,
    /// Authentication token for remote database
    pub auth_token: Option<String>,
    /// How often change subscriptions poll for new revisions
    pub poll_interval: Option<Duration>,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl RemoteConfig {
    /// Create a new remote configuration
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            auth_token: Some(auth_token.into()),
            poll_interval: Some(DEFAULT_POLL_INTERVAL),
        }
    }

    /// Set the change subscription poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Check if the remote is configured
    pub const fn is_configured(&self) -> bool {
        self.url.is_some() && self.auth_token.is_some()
    }

    /// Effective poll interval
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL)
    }
}

/// Database wrapper for libSQL connections
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
    remote: bool,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::from_local(db).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_local(db).await
    }

    /// Connect directly to a remote libSQL/Turso database.
    ///
    /// Every statement travels over the network; there is no local replica.
    pub async fn open_remote(config: &RemoteConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| Error::InvalidInput("Remote URL is required".into()))?;
        let token = config
            .auth_token
            .clone()
            .ok_or_else(|| Error::InvalidInput("Auth token is required".into()))?;

        tracing::debug!("Connecting to remote database at {url}");
        let db = Builder::new_remote(url, token).build().await?;
        let conn = db.connect()?;

        let database = Self {
            _db: db,
            conn,
            remote: true,
        };
        database.migrate().await?;
        Ok(database)
    }

    async fn from_local(db: LibSqlDatabase) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self {
            _db: db,
            conn,
            remote: false,
        };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` pragmas for on-device use
    async fn configure(&self) -> Result<()> {
        // in-memory databases reject WAL
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Whether this database lives behind a network connection
    pub const fn is_remote(&self) -> bool {
        self.remote
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(!db.is_remote());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_file_creates_schema() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("mindful.db");
        let db = Database::open(&path).await.unwrap();

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM kv_store", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_remote_config_new() {
        let config = RemoteConfig::new("libsql://test.turso.io", "test-token");
        assert!(config.is_configured());
        assert_eq!(config.url, Some("libsql://test.turso.io".to_string()));
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_remote_config_default_not_configured() {
        let config = RemoteConfig::default();
        assert!(!config.is_configured());
    }

    #[test]
    fn test_remote_config_debug_redacts_token() {
        let config = RemoteConfig::new("libsql://test.turso.io", "secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    /// Integration test against a real remote - only runs if env vars are set
    /// Run with: MINDFUL_REMOTE_URL=... MINDFUL_REMOTE_TOKEN=... cargo test test_open_remote -- --ignored
    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires MINDFUL_REMOTE_URL and MINDFUL_REMOTE_TOKEN"]
    async fn test_open_remote() {
        let url = env::var("MINDFUL_REMOTE_URL").expect("MINDFUL_REMOTE_URL must be set");
        let token = env::var("MINDFUL_REMOTE_TOKEN").expect("MINDFUL_REMOTE_TOKEN must be set");

        let db = Database::open_remote(&RemoteConfig::new(url, token))
            .await
            .unwrap();
        assert!(db.is_remote());

        let mut rows = db.connection().query("SELECT 1", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 1);
    }
}
