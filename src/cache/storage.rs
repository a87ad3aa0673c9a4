// src/cache/storage.rs
//! Named persistent partitions (the Cache Storage API surface).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::request::CacheResponse;

/// Backing store for cache partitions. Opening is idempotent and concurrent
/// writes to one partition must not corrupt it; the engine adds no locking.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if it does not exist.
    async fn open(&self, partition: &str) -> Result<()>;
    /// Names of every existing partition.
    async fn partitions(&self) -> Result<Vec<String>>;
    /// Drop a whole partition. Returns whether it existed.
    async fn delete_partition(&self, partition: &str) -> Result<bool>;

    async fn lookup(&self, partition: &str, key: &str) -> Result<Option<CacheResponse>>;
    async fn put(&self, partition: &str, key: &str, response: CacheResponse) -> Result<()>;
    async fn remove(&self, partition: &str, key: &str) -> Result<bool>;
    /// Request keys stored in `partition`.
    async fn keys(&self, partition: &str) -> Result<Vec<String>>;
}

type Partitions = BTreeMap<String, BTreeMap<String, CacheResponse>>;

/// In-process storage; also the reference behaviour for tests.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    inner: RwLock<Partitions>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Partitions>> {
        self.inner.read().map_err(|_| anyhow!("cache storage lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Partitions>> {
        self.inner.write().map_err(|_| anyhow!("cache storage lock poisoned"))
    }

    /// Sum of body sizes in one partition.
    pub fn partition_bytes(&self, partition: &str) -> u64 {
        self.read()
            .ok()
            .and_then(|g| g.get(partition).map(|p| p.values().map(|r| r.size()).sum()))
            .unwrap_or(0)
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, partition: &str) -> Result<()> {
        self.write()?.entry(partition.to_string()).or_default();
        Ok(())
    }

    async fn partitions(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool> {
        Ok(self.write()?.remove(partition).is_some())
    }

    async fn lookup(&self, partition: &str, key: &str) -> Result<Option<CacheResponse>> {
        Ok(self
            .read()?
            .get(partition)
            .and_then(|p| p.get(key))
            .cloned())
    }

    async fn put(&self, partition: &str, key: &str, response: CacheResponse) -> Result<()> {
        self.write()?
            .entry(partition.to_string())
            .or_default()
            .insert(key.to_string(), response);
        Ok(())
    }

    async fn remove(&self, partition: &str, key: &str) -> Result<bool> {
        Ok(self
            .write()?
            .get_mut(partition)
            .is_some_and(|p| p.remove(key).is_some()))
    }

    async fn keys(&self, partition: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .get(partition)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default())
    }
}
