//! Store Adapter Module
//!
//! A single interface over the in-memory and Redis stores.

use crate::cache::{CacheTier, MemoryStore, RedisStore};
use crate::error::Result;

// == Cache Backend ==
/// Backing store selected at startup.
#[derive(Debug)]
pub enum CacheBackend {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl CacheBackend {
    /// Short name reported by the stats endpoint.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheBackend::Memory(_) => "memory",
            CacheBackend::Redis(_) => "redis",
        }
    }

    /// The in-memory store, if that is the active backend.
    pub fn as_memory(&self) -> Option<&MemoryStore> {
        match self {
            CacheBackend::Memory(store) => Some(store),
            CacheBackend::Redis(_) => None,
        }
    }

    pub async fn get(&self, tier: CacheTier, key: &str) -> Result<Option<String>> {
        match self {
            CacheBackend::Memory(store) => Ok(store.get(tier, key)),
            CacheBackend::Redis(store) => store.get(tier, key).await,
        }
    }

    pub async fn set(&self, tier: CacheTier, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        match self {
            CacheBackend::Memory(store) => store.set(tier, key, value, ttl_seconds),
            CacheBackend::Redis(store) => store.set(tier, key, value, ttl_seconds).await,
        }
    }

    pub async fn delete(&self, tier: CacheTier, key: &str) -> Result<bool> {
        match self {
            CacheBackend::Memory(store) => Ok(store.delete(tier, key)),
            CacheBackend::Redis(store) => store.delete(tier, key).await,
        }
    }

    /// Empties one tier, returning the number of entries removed.
    pub async fn clear(&self, tier: CacheTier) -> Result<usize> {
        match self {
            CacheBackend::Memory(store) => Ok(store.clear(tier)),
            CacheBackend::Redis(store) => store.clear(tier).await,
        }
    }

    /// Keys of a tier containing `pattern` (all keys when `None`).
    pub async fn list_keys(&self, tier: CacheTier, pattern: Option<&str>) -> Result<Vec<String>> {
        match self {
            CacheBackend::Memory(store) => Ok(store.list_keys(tier, pattern)),
            CacheBackend::Redis(store) => store.list_keys(tier, pattern).await,
        }
    }
}
