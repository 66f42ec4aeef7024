//! Cache Module
//!
//! Tiered response cache with in-memory and Redis backends, statistics and
//! invalidation.

mod backend;
mod entry;
mod invalidation;
mod key;
mod memory;
mod remote;
mod response_cache;
mod stats;
mod tier;


// Re-export public types
pub use backend::CacheBackend;
pub use entry::CacheEntry;
pub use invalidation::Resource;
pub use key::{caller_segment, canonical_query, KeyRequest, DEFAULT_NAMESPACE};
pub use memory::MemoryStore;
pub use remote::RedisStore;
pub use response_cache::{ResponseCache, StatsReport, TierKeyCounts};
pub use stats::{hit_rate, CacheStats, StatsSnapshot};
pub use tier::{CacheTier, TierConfig};

use crate::error::{CacheError, Result};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 2048;

/// Maximum allowed payload size in bytes
pub const MAX_ENTRY_SIZE: usize = 1024 * 1024; // 1 MB

/// Checks a write against the key, size and TTL limits shared by all backends.
pub(crate) fn validate_entry(key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::KeyTooLong(MAX_KEY_LENGTH));
    }
    if value.len() > MAX_ENTRY_SIZE {
        return Err(CacheError::EntryTooLarge {
            size: value.len(),
            max: MAX_ENTRY_SIZE,
        });
    }
    if ttl_seconds == 0 {
        return Err(CacheError::InvalidTtl(ttl_seconds));
    }
    Ok(())
}
