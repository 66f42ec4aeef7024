//! Invalidation Module
//!
//! Removes entries before their TTL: by exact key, by pattern, by named
//! resource, or everything at once.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::cache::{caller_segment, CacheTier, ResponseCache};
use crate::error::Result;

// == Resource ==
/// A business resource whose cached responses can be dropped together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Dishes,
    Orders,
    Expenses,
    /// Everything cached for one authenticated caller
    User(String),
    /// Any other substring of a cache key
    Custom(String),
}

impl Resource {
    /// Substring that every key belonging to the resource contains.
    pub fn pattern(&self) -> String {
        match self {
            Resource::Dishes => "/dishes".to_string(),
            Resource::Orders => "/orders".to_string(),
            Resource::Expenses => "/expenses".to_string(),
            Resource::User(id) => caller_segment(id),
            Resource::Custom(pattern) => pattern.clone(),
        }
    }

    /// Whether `key` belongs to the resource.
    ///
    /// The caller segment always ends a key, so user keys match on the
    /// full `:user:<id>` suffix and `user:42` never takes `user:420` along.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Resource::User(id) => key.ends_with(&format!(":{}", caller_segment(id))),
            _ => key.contains(&self.pattern()),
        }
    }
}

impl FromStr for Resource {
    type Err = Infallible;

    /// Parses `dishes`, `orders`, `expenses` or `user:<id>`; anything else is
    /// taken as a custom pattern.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "dishes" => Resource::Dishes,
            "orders" => Resource::Orders,
            "expenses" => Resource::Expenses,
            other => match other.strip_prefix("user:") {
                Some(id) if !id.is_empty() => Resource::User(id.to_string()),
                _ => Resource::Custom(other.to_string()),
            },
        })
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Dishes => f.write_str("dishes"),
            Resource::Orders => f.write_str("orders"),
            Resource::Expenses => f.write_str("expenses"),
            Resource::User(id) => write!(f, "user:{id}"),
            Resource::Custom(pattern) => f.write_str(pattern),
        }
    }
}

fn tiers(tier: Option<CacheTier>) -> Vec<CacheTier> {
    match tier {
        Some(tier) => vec![tier],
        None => CacheTier::ALL.to_vec(),
    }
}

impl ResponseCache {
    // == Invalidate All ==
    /// Empties every tier. Removed entries count as deletes.
    pub async fn invalidate_all(&self) -> Result<usize> {
        let mut removed = 0;
        for tier in CacheTier::ALL {
            removed += self.backend().clear(tier).await?;
        }
        self.stats().record_deletes(removed as u64);
        info!(removed, "Invalidated entire cache");
        Ok(removed)
    }

    // == Invalidate By Prefix ==
    /// Deletes every key containing `pattern`, in one tier or all of them.
    ///
    /// Keys are deleted one by one; each removal counts as a delete.
    /// Returns the number removed, 0 when nothing matched.
    pub async fn invalidate_by_prefix(&self, pattern: &str, tier: Option<CacheTier>) -> Result<usize> {
        self.invalidate_where(pattern, tier, |_| true).await
    }

    /// Deletes keys containing `pattern` that also pass `keep`.
    async fn invalidate_where<F>(&self, pattern: &str, tier: Option<CacheTier>, keep: F) -> Result<usize>
    where
        F: Fn(&str) -> bool,
    {
        let mut removed = 0;
        for tier in tiers(tier) {
            for key in self.backend().list_keys(tier, Some(pattern)).await? {
                if !keep(&key) {
                    continue;
                }
                if self.backend().delete(tier, &key).await? {
                    self.stats().record_deletes(1);
                    removed += 1;
                }
            }
        }
        info!(pattern, removed, "Invalidated cache entries by pattern");
        Ok(removed)
    }

    // == Invalidate Key ==
    /// Deletes one exact key, in one tier or all of them.
    pub async fn invalidate_key(&self, key: &str, tier: Option<CacheTier>) -> Result<usize> {
        let mut removed = 0;
        for tier in tiers(tier) {
            if self.backend().delete(tier, key).await? {
                self.stats().record_deletes(1);
                removed += 1;
            }
        }
        Ok(removed)
    }

    // == Invalidate Resource ==
    /// Drops every cached response of a named resource across all tiers.
    pub async fn invalidate_resource(&self, resource: &Resource) -> Result<usize> {
        self.invalidate_where(&resource.pattern(), None, |key| resource.matches(key))
            .await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::KeyRequest;
    use crate::config::Config;
    use tokio_test::assert_ok;

    async fn seeded_cache() -> ResponseCache {
        let cache = ResponseCache::from_config(&Config::default()).unwrap();
        let keys = [
            (CacheTier::Medium, KeyRequest::new("GET", "/api/dishes").derive()),
            (
                CacheTier::Medium,
                KeyRequest::new("GET", "/api/dishes")
                    .with_query("category=main")
                    .derive(),
            ),
            (CacheTier::Short, KeyRequest::new("GET", "/api/dishes/7").derive()),
            (
                CacheTier::Short,
                KeyRequest::new("GET", "/api/orders").with_caller("42").derive(),
            ),
            (
                CacheTier::Long,
                KeyRequest::new("GET", "/api/expenses").with_caller("43").derive(),
            ),
        ];
        for (tier, key) in keys {
            assert!(cache.store(tier, &key, "{}", None).await);
        }
        cache
    }

    #[test]
    fn test_resource_parse() {
        assert_eq!("dishes".parse::<Resource>().unwrap(), Resource::Dishes);
        assert_eq!(
            "user:42".parse::<Resource>().unwrap(),
            Resource::User("42".into())
        );
        assert_eq!(
            "user:".parse::<Resource>().unwrap(),
            Resource::Custom("user:".into())
        );
        assert_eq!(
            "menu".parse::<Resource>().unwrap(),
            Resource::Custom("menu".into())
        );
    }

    #[test]
    fn test_resource_display_round_trips_names() {
        for name in ["dishes", "orders", "expenses", "user:7"] {
            assert_eq!(name.parse::<Resource>().unwrap().to_string(), name);
        }
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix_across_tiers() {
        let cache = seeded_cache().await;

        let removed = assert_ok!(cache.invalidate_by_prefix("/api/dishes", None).await);
        assert_eq!(removed, 3);
        assert_eq!(cache.stats().snapshot().deletes, 3);

        let report = cache.report().await;
        assert_eq!(report.keys.short, Some(1));
        assert_eq!(report.keys.medium, Some(0));
        assert_eq!(report.keys.long, Some(1));
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix_single_tier() {
        let cache = seeded_cache().await;

        let removed = assert_ok!(cache.invalidate_by_prefix("dishes", Some(CacheTier::Short)).await);
        assert_eq!(removed, 1);
        assert_eq!(cache.report().await.keys.medium, Some(2));
    }

    #[tokio::test]
    async fn test_invalidate_no_match_returns_zero() {
        let cache = seeded_cache().await;

        let removed = assert_ok!(cache.invalidate_by_prefix("/api/reports", None).await);
        assert_eq!(removed, 0);
        assert_eq!(cache.stats().snapshot().deletes, 0);
    }

    #[tokio::test]
    async fn test_invalidate_user_resource() {
        let cache = seeded_cache().await;

        let removed = assert_ok!(cache.invalidate_resource(&Resource::User("42".into())).await);
        assert_eq!(removed, 1);

        let removed = assert_ok!(cache.invalidate_resource(&Resource::Expenses).await);
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_invalidate_user_leaves_longer_ids_alone() {
        let cache = ResponseCache::from_config(&Config::default()).unwrap();
        let orders_42 = KeyRequest::new("GET", "/api/orders").with_caller("42").derive();
        let orders_420 = KeyRequest::new("GET", "/api/orders").with_caller("420").derive();
        assert!(cache.store(CacheTier::Short, &orders_42, "[]", None).await);
        assert!(cache.store(CacheTier::Short, &orders_420, "[]", None).await);

        let removed = assert_ok!(cache.invalidate_resource(&Resource::User("42".into())).await);
        assert_eq!(removed, 1);
        assert_eq!(cache.stats().snapshot().deletes, 1);
        assert!(cache.lookup(CacheTier::Short, &orders_42).await.is_none());
        assert_eq!(
            cache.lookup(CacheTier::Short, &orders_420).await.as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_resource_matches() {
        let user = Resource::User("42".into());
        assert!(user.matches("api:GET:/api/orders:user:42"));
        assert!(!user.matches("api:GET:/api/orders:user:420"));
        assert!(!user.matches("api:GET:/api/user/42"));
        assert!(Resource::Dishes.matches("api:GET:/api/dishes/7"));
        assert!(!Resource::Dishes.matches("api:GET:/api/orders"));
    }

    #[tokio::test]
    async fn test_invalidate_key() {
        let cache = seeded_cache().await;
        let key = KeyRequest::new("GET", "/api/dishes/7").derive();

        assert_eq!(assert_ok!(cache.invalidate_key(&key, None).await), 1);
        assert_eq!(assert_ok!(cache.invalidate_key(&key, None).await), 0);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = seeded_cache().await;

        assert_eq!(assert_ok!(cache.invalidate_all().await), 5);
        assert_eq!(cache.stats().snapshot().deletes, 5);
        assert_eq!(assert_ok!(cache.invalidate_all().await), 0);
    }
}
