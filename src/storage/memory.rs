use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::ChordResult;

/// Contract over a byte-keyed byte-value map.
///
/// Backends may suspend on I/O; the in-memory default never does. Failures
/// propagate as [`crate::error::ChordError::Store`] and are non-fatal to the
/// ring.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &[u8], value: &[u8]) -> ChordResult<()>;

    /// Fetches the value for `key`. Missing keys resolve to an empty value.
    async fn get(&self, key: &[u8]) -> ChordResult<Vec<u8>>;

    /// Removes `key`. Deleting an absent key is a no-op.
    async fn del(&self, key: &[u8]) -> ChordResult<()>;
}

/// In-memory store backing the node's arc of the keyspace.
pub struct MemoryStore {
    kvs: DashMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            kvs: DashMap::new(),
        }
    }

    /// Number of keys currently held locally.
    pub fn len(&self) -> usize {
        self.kvs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kvs.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn set(&self, key: &[u8], value: &[u8]) -> ChordResult<()> {
        self.kvs.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> ChordResult<Vec<u8>> {
        Ok(self
            .kvs
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn del(&self, key: &[u8]) -> ChordResult<()> {
        self.kvs.remove(key);
        Ok(())
    }
}
