//! Stand-in remote used when no mirror is configured or reachable.

use async_trait::async_trait;
use mindful_core::remote::{RemoteDocument, RemoteStore, RemoteSubscription, SortDirection};
use mindful_core::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct OfflineRemote;

fn unavailable<T>() -> Result<T> {
    Err(Error::Remote("no remote mirror available".to_string()))
}

#[async_trait]
impl RemoteStore for OfflineRemote {
    async fn create(&self, _collection: &str, _data: serde_json::Value) -> Result<String> {
        unavailable()
    }

    async fn update(&self, _collection: &str, _id: &str, _data: serde_json::Value) -> Result<()> {
        unavailable()
    }

    async fn delete(&self, _collection: &str, _id: &str) -> Result<()> {
        unavailable()
    }

    async fn query(
        &self,
        _collection: &str,
        _order_by: &str,
        _direction: SortDirection,
    ) -> Result<Vec<RemoteDocument>> {
        unavailable()
    }

    async fn subscribe(
        &self,
        _collection: &str,
        _order_by: &str,
        _direction: SortDirection,
    ) -> Result<RemoteSubscription> {
        unavailable()
    }
}
