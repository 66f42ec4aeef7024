//! In-Memory Store Module
//!
//! One LRU map per tier, with TTL checked on read and swept in the background.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use lru::LruCache;
use tracing::warn;

use crate::cache::{validate_entry, CacheEntry, CacheStats, CacheTier};
use crate::error::{CacheError, Result};

type TierMap = LruCache<String, CacheEntry>;

// == Memory Store ==
/// In-process store holding a bounded LRU map per tier.
///
/// Each operation holds its tier's mutex for the whole read-modify-write and
/// never across an await, so operations on one key never interleave.
#[derive(Debug)]
pub struct MemoryStore {
    tiers: [Mutex<TierMap>; 3],
    stats: Arc<CacheStats>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store holding at most `max_entries` entries per tier.
    ///
    /// Expiry and eviction events are recorded into `stats`.
    pub fn new(max_entries: usize, stats: Arc<CacheStats>) -> Result<Self> {
        let capacity = NonZeroUsize::new(max_entries)
            .ok_or_else(|| CacheError::Config("in-memory capacity must be > 0".into()))?;

        Ok(Self {
            tiers: [
                Mutex::new(LruCache::new(capacity)),
                Mutex::new(LruCache::new(capacity)),
                Mutex::new(LruCache::new(capacity)),
            ],
            stats,
        })
    }

    fn lock(&self, tier: CacheTier, op: &'static str) -> MutexGuard<'_, TierMap> {
        match self.tiers[tier.index()].lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    tier = tier.name(),
                    result = "poisoned_recovered",
                    "Recovered from poisoned cache lock"
                );
                poisoned.into_inner()
            }
        }
    }

    // == Get ==
    /// Returns the live payload for `key`, dropping it if it has expired.
    pub fn get(&self, tier: CacheTier, key: &str) -> Option<String> {
        let mut map = self.lock(tier, "get");

        match map.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => {}
        }

        map.pop(key);
        self.stats.record_expired(1);
        None
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry and its TTL.
    ///
    /// When the tier is full the least recently used entry is evicted.
    pub fn set(&self, tier: CacheTier, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        validate_entry(key, value, ttl_seconds)?;

        let entry = CacheEntry::new(key, value, ttl_seconds);
        let displaced = self.lock(tier, "set").push(key.to_string(), entry);

        if let Some((old_key, old_entry)) = displaced {
            if old_key != key {
                if old_entry.is_expired() {
                    self.stats.record_expired(1);
                } else {
                    self.stats.record_evictions(1);
                }
            }
        }
        Ok(())
    }

    // == Delete ==
    /// Removes `key`; returns whether a live entry was removed.
    pub fn delete(&self, tier: CacheTier, key: &str) -> bool {
        match self.lock(tier, "delete").pop(key) {
            Some(entry) if entry.is_expired() => {
                self.stats.record_expired(1);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    // == Clear ==
    /// Empties a tier, returning how many live entries it held.
    pub fn clear(&self, tier: CacheTier) -> usize {
        let mut map = self.lock(tier, "clear");
        let now = Instant::now();
        let live = map.iter().filter(|(_, e)| !e.is_expired_at(now)).count();
        let expired = map.len() - live;
        map.clear();
        drop(map);

        if expired > 0 {
            self.stats.record_expired(expired as u64);
        }
        live
    }

    // == List Keys ==
    /// Returns live keys of a tier containing `pattern`, or all live keys.
    pub fn list_keys(&self, tier: CacheTier, pattern: Option<&str>) -> Vec<String> {
        let map = self.lock(tier, "list_keys");
        let now = Instant::now();
        map.iter()
            .filter(|(_, e)| !e.is_expired_at(now))
            .filter(|(k, _)| pattern.map_or(true, |p| k.contains(p)))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Number of live entries in a tier.
    pub fn len(&self, tier: CacheTier) -> usize {
        self.list_keys(tier, None).len()
    }

    pub fn is_empty(&self) -> bool {
        CacheTier::ALL.iter().all(|t| self.len(*t) == 0)
    }

    // == Sweep Expired ==
    /// Removes all expired entries from a tier.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self, tier: CacheTier) -> usize {
        let mut map = self.lock(tier, "sweep_expired");
        let now = Instant::now();
        let expired_keys: Vec<String> = map
            .iter()
            .filter(|(_, e)| e.is_expired_at(now))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired_keys {
            map.pop(key);
        }
        drop(map);

        let count = expired_keys.len();
        if count > 0 {
            self.stats.record_expired(count as u64);
        }
        count
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MAX_ENTRY_SIZE;
    use std::thread::sleep;
    use std::time::Duration;

    fn store(max_entries: usize) -> (MemoryStore, Arc<CacheStats>) {
        let stats = Arc::new(CacheStats::new());
        (MemoryStore::new(max_entries, stats.clone()).unwrap(), stats)
    }

    #[test]
    fn test_store_new_rejects_zero_capacity() {
        let result = MemoryStore::new(0, Arc::default());
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn test_store_set_and_get() {
        let (store, _) = store(100);

        store.set(CacheTier::Short, "key1", "[1]", 60).unwrap();

        assert_eq!(store.get(CacheTier::Short, "key1").as_deref(), Some("[1]"));
        assert_eq!(store.len(CacheTier::Short), 1);
    }

    #[test]
    fn test_tiers_are_isolated() {
        let (store, _) = store(100);

        store.set(CacheTier::Short, "key1", "[1]", 60).unwrap();

        assert!(store.get(CacheTier::Long, "key1").is_none());
        assert_eq!(store.len(CacheTier::Long), 0);
    }

    #[test]
    fn test_store_overwrite_replaces_value() {
        let (store, stats) = store(100);

        store.set(CacheTier::Medium, "key1", "[1]", 60).unwrap();
        store.set(CacheTier::Medium, "key1", "[2]", 60).unwrap();

        assert_eq!(store.get(CacheTier::Medium, "key1").as_deref(), Some("[2]"));
        assert_eq!(store.len(CacheTier::Medium), 1);
        assert_eq!(stats.snapshot().evictions, 0);
    }

    #[test]
    fn test_store_delete() {
        let (store, _) = store(100);

        store.set(CacheTier::Short, "key1", "[1]", 60).unwrap();

        assert!(store.delete(CacheTier::Short, "key1"));
        assert!(!store.delete(CacheTier::Short, "key1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_ttl_expiration() {
        let (store, stats) = store(100);

        store.set(CacheTier::Short, "key1", "[1]", 1).unwrap();
        assert!(store.get(CacheTier::Short, "key1").is_some());

        sleep(Duration::from_millis(1500));

        assert!(store.get(CacheTier::Short, "key1").is_none());
        let snap = stats.snapshot();
        assert_eq!(snap.expired, 1);
        assert_eq!(snap.deletes, 0);
    }

    #[test]
    fn test_store_lru_eviction() {
        let (store, stats) = store(3);

        store.set(CacheTier::Short, "key1", "1", 60).unwrap();
        store.set(CacheTier::Short, "key2", "2", 60).unwrap();
        store.set(CacheTier::Short, "key3", "3", 60).unwrap();

        // Touch key1 so key2 becomes the eviction candidate
        store.get(CacheTier::Short, "key1").unwrap();
        store.set(CacheTier::Short, "key4", "4", 60).unwrap();

        assert_eq!(store.len(CacheTier::Short), 3);
        assert!(store.get(CacheTier::Short, "key2").is_none());
        assert!(store.get(CacheTier::Short, "key1").is_some());
        assert_eq!(stats.snapshot().evictions, 1);
    }

    #[test]
    fn test_store_sweep_expired() {
        let (store, stats) = store(100);

        store.set(CacheTier::Short, "old", "1", 1).unwrap();
        store.set(CacheTier::Short, "fresh", "2", 60).unwrap();

        sleep(Duration::from_millis(1100));

        assert_eq!(store.sweep_expired(CacheTier::Short), 1);
        assert_eq!(store.len(CacheTier::Short), 1);
        assert_eq!(stats.snapshot().expired, 1);
    }

    #[test]
    fn test_list_keys_with_pattern() {
        let (store, _) = store(100);

        store.set(CacheTier::Short, "api:GET:/api/dishes", "[]", 60).unwrap();
        store.set(CacheTier::Short, "api:GET:/api/dishes/1", "{}", 60).unwrap();
        store.set(CacheTier::Short, "api:GET:/api/orders", "[]", 60).unwrap();

        let mut keys = store.list_keys(CacheTier::Short, Some("dishes"));
        keys.sort();
        assert_eq!(keys, vec!["api:GET:/api/dishes", "api:GET:/api/dishes/1"]);
        assert_eq!(store.list_keys(CacheTier::Short, None).len(), 3);
        assert!(store.list_keys(CacheTier::Short, Some("expenses")).is_empty());
    }

    #[test]
    fn test_clear_returns_live_count() {
        let (store, _) = store(100);

        store.set(CacheTier::Long, "a", "1", 60).unwrap();
        store.set(CacheTier::Long, "b", "2", 60).unwrap();

        assert_eq!(store.clear(CacheTier::Long), 2);
        assert_eq!(store.len(CacheTier::Long), 0);
    }

    #[test]
    fn test_store_value_too_large() {
        let (store, _) = store(100);
        let large_value = "x".repeat(MAX_ENTRY_SIZE + 1);

        let result = store.set(CacheTier::Short, "key", &large_value, 60);
        assert!(matches!(result, Err(CacheError::EntryTooLarge { .. })));
        assert!(store.get(CacheTier::Short, "key").is_none());
    }

    #[test]
    fn test_store_zero_ttl_rejected() {
        let (store, _) = store(100);

        let result = store.set(CacheTier::Short, "key", "1", 0);
        assert!(matches!(result, Err(CacheError::InvalidTtl(0))));
    }
}
