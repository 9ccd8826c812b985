//! Key-value storage abstractions
//!
//! A `Store` hands out named collections. Collections are byte-keyed with
//! JSON-encoded values by convention; entries may carry an optional TTL.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>);
    async fn remove(&self, key: &[u8]);
    async fn contains(&self, key: &[u8]) -> bool {
        self.get(key).await.is_some()
    }
}

pub trait Store: Send + Sync {
    /// Returns the named collection, creating it when `create_if_missing`.
    /// `persist` selects a disk-backed collection; otherwise in-memory.
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>>;

    fn remove_collection(&self, name: &str) -> bool;
}
