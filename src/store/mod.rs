pub mod disk;
pub mod memory;

use crate::core::cache::{KeyValueCollection, Store};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::warn;

/// A thread-safe key-value store that can hold multiple named collections.
///
/// Persistent collections map to fjall partitions under the data path;
/// non-persistent ones live in memory and vanish with the process.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Arc<Keyspace>>,
}

impl KeyValueStore {
    pub fn open(data_path: &Path) -> Self {
        let keyspace = fjall::Config::new(data_path.join("store"))
            .open()
            .map_err(|e| warn!("Failed to open key-value store: {e}"))
            .ok()
            .map(Arc::new);

        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    /// A store with no backing keyspace; every collection is in-memory.
    pub fn ephemeral() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }
}

impl Store for KeyValueStore {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>> {
        if create_if_missing {
            let mut collections = self.collections.write().unwrap();
            if !collections.contains_key(name) {
                let new_collection: Option<Arc<dyn KeyValueCollection>> = if persist {
                    match self.keyspace.as_ref() {
                        Some(ks) => ks
                            .open_partition(name, PartitionCreateOptions::default())
                            .ok()
                            .map(|partition| {
                                Arc::new(DiskCollection::new(Arc::clone(ks), partition))
                                    as Arc<dyn KeyValueCollection>
                            }),
                        // A persistent collection was requested, but there is
                        // no keyspace; fall back to memory so the app still
                        // works, just without durability.
                        None => Some(Arc::new(MemoryCollection::new())),
                    }
                } else {
                    Some(Arc::new(MemoryCollection::new()))
                };

                match new_collection {
                    Some(collection) => {
                        collections.insert(name.to_string(), collection);
                    }
                    None => return None,
                }
            }
        }

        let collections = self.collections.read().unwrap();
        collections.get(name).cloned()
    }

    fn remove_collection(&self, name: &str) -> bool {
        let mut collections = self.collections.write().unwrap();
        collections.remove(name).is_some()
    }
}
