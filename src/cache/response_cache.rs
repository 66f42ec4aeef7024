//! Response Cache Module
//!
//! The cache context handed to the interceptor, invalidation callers and
//! admin handlers. Each instance owns its own backend and counters.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheBackend, CacheStats, CacheTier, MemoryStore, RedisStore, StatsSnapshot, TierConfig};
use crate::config::Config;
use crate::error::Result;

struct Inner {
    backend: CacheBackend,
    stats: Arc<CacheStats>,
    tiers: [TierConfig; 3],
}

// == Response Cache ==
/// Shared handle to one cache instance. Cloning is cheap.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<Inner>,
}

/// Live entry count per tier; `None` when the backend could not be queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TierKeyCounts {
    pub short: Option<usize>,
    pub medium: Option<usize>,
    pub long: Option<usize>,
}

/// Everything the stats endpoint reports.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub backend: &'static str,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub keys: TierKeyCounts,
}

impl ResponseCache {
    // == Constructors ==
    /// Builds the cache described by `config`.
    ///
    /// Uses Redis when `REDIS_URL` is configured and the in-memory store
    /// otherwise. Fails only on configuration that can never work.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let stats = Arc::new(CacheStats::new());

        let backend = match &config.redis {
            Some(redis) => {
                info!(prefix = %redis.prefix, "Using Redis cache backend");
                CacheBackend::Redis(RedisStore::new(redis.clone())?)
            }
            None => {
                info!(max_entries = config.max_entries, "Using in-memory cache backend");
                CacheBackend::Memory(MemoryStore::new(config.max_entries, stats.clone())?)
            }
        };

        Ok(Self::with_backend(backend, stats, config))
    }

    /// Builds an in-memory cache regardless of `config.redis`.
    pub fn in_memory(config: &Config) -> Result<Self> {
        Self::from_config(&Config {
            redis: None,
            ..config.clone()
        })
    }

    fn with_backend(backend: CacheBackend, stats: Arc<CacheStats>, config: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                stats,
                tiers: CacheTier::ALL.map(|tier| config.tier(tier)),
            }),
        }
    }

    pub fn backend(&self) -> &CacheBackend {
        &self.inner.backend
    }

    pub fn stats(&self) -> &CacheStats {
        &self.inner.stats
    }

    pub fn tier_config(&self, tier: CacheTier) -> TierConfig {
        self.inner.tiers[tier.index()]
    }

    /// TTL for a write: the override if given, otherwise the tier default.
    pub fn ttl_for(&self, tier: CacheTier, ttl_override: Option<u64>) -> u64 {
        ttl_override.unwrap_or_else(|| self.tier_config(tier).default_ttl)
    }

    // == Lookup ==
    /// Looks up `key`, counting a hit or a miss.
    ///
    /// Backend failures are logged and reported as a miss.
    pub async fn lookup(&self, tier: CacheTier, key: &str) -> Option<String> {
        match self.inner.backend.get(tier, key).await {
            Ok(Some(payload)) => {
                self.inner.stats.record_hit();
                Some(payload)
            }
            Ok(None) => {
                self.inner.stats.record_miss();
                None
            }
            Err(err) => {
                warn!(error = %err, key, tier = tier.name(), "Cache lookup failed, treating as miss");
                self.inner.stats.record_miss();
                None
            }
        }
    }

    // == Store ==
    /// Writes `payload` under `key`, counting a set on success.
    ///
    /// Returns whether the write succeeded; failures are only logged.
    pub async fn store(&self, tier: CacheTier, key: &str, payload: &str, ttl_override: Option<u64>) -> bool {
        let ttl = self.ttl_for(tier, ttl_override);
        match self.inner.backend.set(tier, key, payload, ttl).await {
            Ok(()) => {
                self.inner.stats.record_set();
                debug!(key, tier = tier.name(), ttl, bytes = payload.len(), "Cached response");
                true
            }
            Err(err) => {
                warn!(error = %err, key, tier = tier.name(), "Cache write failed");
                false
            }
        }
    }

    // == Report ==
    /// Current counters plus live key counts per tier.
    pub async fn report(&self) -> StatsReport {
        let mut counts = [None; 3];
        for tier in CacheTier::ALL {
            counts[tier.index()] = match self.inner.backend.list_keys(tier, None).await {
                Ok(keys) => Some(keys.len()),
                Err(err) => {
                    warn!(error = %err, tier = tier.name(), "Could not count cache keys");
                    None
                }
            };
        }

        StatsReport {
            backend: self.inner.backend.kind(),
            stats: self.inner.stats.snapshot(),
            keys: TierKeyCounts {
                short: counts[0],
                medium: counts[1],
                long: counts[2],
            },
        }
    }
}
