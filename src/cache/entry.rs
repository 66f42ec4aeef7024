//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A cached response payload and its expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key the entry is stored under
    pub key: String,
    /// JSON response body, kept verbatim
    pub value: String,
    /// When the entry was written
    pub inserted_at: Instant,
    /// Lifetime in whole seconds
    pub ttl_seconds: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl_seconds` from now.
    pub fn new(key: impl Into<String>, value: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            inserted_at: Instant::now(),
            ttl_seconds,
        }
    }

    /// Instant after which the entry is treated as absent.
    pub fn expires_at(&self) -> Instant {
        self.inserted_at + Duration::from_secs(self.ttl_seconds)
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiry instant.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }

    /// Remaining lifetime in whole seconds, 0 once expired.
    pub fn ttl_remaining(&self) -> u64 {
        self.expires_at()
            .saturating_duration_since(Instant::now())
            .as_secs()
    }

    /// Approximate memory footprint used for the size ceiling.
    pub fn size(&self) -> usize {
        self.key.len() + self.value.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("api:GET:/api/dishes", r#"{"dishes":[]}"#, 60);

        assert_eq!(entry.key, "api:GET:/api/dishes");
        assert_eq!(entry.value, r#"{"dishes":[]}"#);
        assert_eq!(entry.ttl_seconds, 60);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("k", "[]", 1);

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), 0);
    }

    #[test]
    fn test_ttl_remaining_seconds() {
        let entry = CacheEntry::new("k", "[]", 10);

        let remaining = entry.ttl_remaining();
        assert!(remaining <= 10);
        assert!(remaining >= 9);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("k", "[]", 5);

        // Expired exactly at the expiry instant, not one tick later
        assert!(entry.is_expired_at(entry.expires_at()));
        assert!(!entry.is_expired_at(entry.inserted_at));
    }

    #[test]
    fn test_size_counts_key_and_value() {
        let entry = CacheEntry::new("abc", "12345", 1);
        assert_eq!(entry.size(), 8);
    }
}
