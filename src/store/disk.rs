use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    value: Vec<u8>,
    expires_at: Option<SystemTime>,
}

/// A collection backed by one fjall partition. Writes are flushed to the
/// journal before returning so state survives process exit.
pub struct DiskCollection {
    keyspace: Arc<Keyspace>,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Arc<Keyspace>, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let res: Result<Option<Vec<u8>>> = (|| {
            let Some(raw) = self.partition.get(key)? else {
                return Ok(None);
            };
            let entry: StoredEntry = serde_json::from_slice(&raw)?;
            if let Some(expires_at) = entry.expires_at
                && SystemTime::now() > expires_at
            {
                debug!(
                    "Entry expired for key: {:?}",
                    String::from_utf8_lossy(key)
                );
                self.partition.remove(key)?;
                return Ok(None);
            }
            Ok(Some(entry.value))
        })();

        match res {
            Ok(val) => val,
            Err(e) => {
                debug!("DiskCollection get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) {
        let res: Result<()> = (|| {
            let entry = StoredEntry {
                value: value.to_vec(),
                expires_at: ttl.map(|d| SystemTime::now() + d),
            };
            self.partition.insert(key, serde_json::to_vec(&entry)?)?;
            self.keyspace.persist(PersistMode::SyncAll)?;
            Ok(())
        })();
        if let Err(e) = res {
            debug!("DiskCollection put error: {}", e);
        }
    }

    async fn remove(&self, key: &[u8]) {
        let res: Result<()> = (|| {
            self.partition.remove(key)?;
            self.keyspace.persist(PersistMode::SyncAll)?;
            Ok(())
        })();
        if let Err(e) = res {
            debug!("DiskCollection remove error: {}", e);
        }
    }
}
