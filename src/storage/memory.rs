//! Memory-only storage backend.

use super::{ClusterStorage, ItemPath, StorageError};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;
use tracing::debug;

type ItemCache = BTreeMap<String, Vec<u8>>;

/// Storage that keeps every value in process memory.
///
/// Nothing survives a restart; it backs tests and transient items.
#[derive(Debug, Default)]
pub struct MemoryClusterStorage {
    items: RwLock<HashMap<ItemPath, ItemCache>>,
}

impl MemoryClusterStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything held for every item.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.items.write().map_err(|_| StorageError::Poisoned)?.clear();
        Ok(())
    }

    /// Number of items with at least one stored value.
    pub fn item_count(&self) -> Result<usize, StorageError> {
        Ok(self.items.read().map_err(|_| StorageError::Poisoned)?.len())
    }
}

impl ClusterStorage for MemoryClusterStorage {
    fn name(&self) -> &str {
        "Memory Cache"
    }

    fn get(&self, item: &ItemPath, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let items = self.items.read().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(item).and_then(|cache| cache.get(path)).cloned())
    }

    fn put(&self, item: &ItemPath, path: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut items = self.items.write().map_err(|_| StorageError::Poisoned)?;
        items.entry(*item).or_default().insert(path.to_string(), value);
        Ok(())
    }

    fn delete(&self, item: &ItemPath, path: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().map_err(|_| StorageError::Poisoned)?;
        if let Some(cache) = items.get_mut(item) {
            cache.remove(path);
            if cache.is_empty() {
                items.remove(item);
                debug!(%item, "dropped empty item cache");
            }
        }
        Ok(())
    }

    fn list_children(&self, item: &ItemPath, path: &str) -> Result<BTreeSet<String>, StorageError> {
        let items = self.items.read().map_err(|_| StorageError::Poisoned)?;
        let Some(cache) = items.get(item) else {
            return Ok(BTreeSet::new());
        };

        let prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(cache
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .map(|rest| rest.split('/').next().unwrap_or(rest).to_string())
            .collect())
    }
}
