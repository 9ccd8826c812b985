use crate::core::cache::KeyValueCollection;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// In-memory collection used for tests and as a fallback when the disk
/// store is unavailable.
pub struct MemoryCollection {
    inner: Arc<Mutex<HashMap<Vec<u8>, Entry>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let entries = self.inner.lock().await;
        if let Some(entry) = entries.get(key) {
            if let Some(expiry) = entry.expires_at
                && expiry < Instant::now()
            {
                debug!("Entry expired for key: {:?}", String::from_utf8_lossy(key));
                return None;
            }
            return Some(entry.value.clone());
        }
        None
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) {
        let expires_at = ttl.map(|duration| Instant::now() + duration);
        let mut entries = self.inner.lock().await;
        entries.insert(
            key.to_vec(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
    }

    async fn remove(&self, key: &[u8]) {
        let mut entries = self.inner.lock().await;
        entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_get_put() {
        let col = MemoryCollection::new();

        assert!(col.get(b"key1").await.is_none());

        col.put(b"key1", b"123", None).await;
        assert_eq!(col.get(b"key1").await, Some(b"123".to_vec()));

        assert!(col.get(b"key2").await.is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let col = MemoryCollection::new();

        col.put(b"key1", b"123", Some(Duration::from_millis(10)))
            .await;
        assert_eq!(col.get(b"key1").await, Some(b"123".to_vec()));

        sleep(Duration::from_millis(20)).await;
        assert!(col.get(b"key1").await.is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let col = MemoryCollection::new();

        col.put(b"key1", b"123", None).await;
        col.remove(b"key1").await;
        assert!(col.get(b"key1").await.is_none());
    }

    #[tokio::test]
    async fn test_contains() {
        let col = MemoryCollection::new();
        assert!(!col.contains(b"key1").await);
        col.put(b"key1", b"1", None).await;
        assert!(col.contains(b"key1").await);
    }
}
