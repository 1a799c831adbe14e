//! Remote mirror that connects on first use.
//!
//! A failed connection attempt is not cached, so a session started while the
//! mirror was unreachable picks it up once connectivity returns.

use async_trait::async_trait;
use mindful_core::db::RemoteConfig;
use mindful_core::remote::{
    LibSqlRemoteStore, RemoteDocument, RemoteStore, RemoteSubscription, SortDirection,
};
use mindful_core::Result;
use tokio::sync::OnceCell;

pub struct LazyRemote {
    config: RemoteConfig,
    store: OnceCell<LibSqlRemoteStore>,
}

impl LazyRemote {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            store: OnceCell::new(),
        }
    }

    /// The connected store, connecting now if no attempt has succeeded yet
    pub async fn connect(&self) -> Result<&LibSqlRemoteStore> {
        self.store
            .get_or_try_init(|| LibSqlRemoteStore::connect(&self.config))
            .await
    }
}

#[async_trait]
impl RemoteStore for LazyRemote {
    async fn create(&self, collection: &str, data: serde_json::Value) -> Result<String> {
        self.connect().await?.create(collection, data).await
    }

    async fn update(&self, collection: &str, id: &str, data: serde_json::Value) -> Result<()> {
        self.connect().await?.update(collection, id, data).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.connect().await?.delete(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Vec<RemoteDocument>> {
        self.connect()
            .await?
            .query(collection, order_by, direction)
            .await
    }

    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<RemoteSubscription> {
        self.connect()
            .await?
            .subscribe(collection, order_by, direction)
            .await
    }
}
