//! Cache Tier Module
//!
//! Named TTL buckets selected per route.

use std::fmt;

use serde::Serialize;
use tracing::warn;

// == Tier Config ==
/// TTL and sweep interval of a single tier, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierConfig {
    /// TTL applied when a route does not override it
    pub default_ttl: u64,
    /// How often expired entries are swept from the in-memory store
    pub check_interval: u64,
}

// == Cache Tier ==
/// A named TTL bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    #[default]
    Short,
    Medium,
    Long,
}

impl CacheTier {
    /// Every tier, in ascending TTL order.
    pub const ALL: [CacheTier; 3] = [CacheTier::Short, CacheTier::Medium, CacheTier::Long];

    /// Resolves a tier by name, falling back to `Short` for unknown names.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "short" => CacheTier::Short,
            "medium" => CacheTier::Medium,
            "long" => CacheTier::Long,
            other => {
                warn!(tier = other, "Unknown cache tier, using short");
                CacheTier::Short
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CacheTier::Short => "short",
            CacheTier::Medium => "medium",
            CacheTier::Long => "long",
        }
    }

    /// Built-in TTL and sweep interval for this tier.
    pub fn default_config(self) -> TierConfig {
        match self {
            CacheTier::Short => TierConfig {
                default_ttl: 300,
                check_interval: 60,
            },
            CacheTier::Medium => TierConfig {
                default_ttl: 1800,
                check_interval: 300,
            },
            CacheTier::Long => TierConfig {
                default_ttl: 7200,
                check_interval: 600,
            },
        }
    }

    /// Position of the tier in [`CacheTier::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_known_tiers() {
        assert_eq!(CacheTier::from_name("short"), CacheTier::Short);
        assert_eq!(CacheTier::from_name("Medium"), CacheTier::Medium);
        assert_eq!(CacheTier::from_name(" long "), CacheTier::Long);
    }

    #[test]
    fn test_from_name_unknown_falls_back_to_short() {
        assert_eq!(CacheTier::from_name("forever"), CacheTier::Short);
        assert_eq!(CacheTier::from_name(""), CacheTier::Short);
    }

    #[test]
    fn test_default_ttls_are_distinct() {
        let ttls: Vec<u64> = CacheTier::ALL
            .iter()
            .map(|t| t.default_config().default_ttl)
            .collect();
        assert_eq!(ttls, vec![300, 1800, 7200]);
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, tier) in CacheTier::ALL.iter().enumerate() {
            assert_eq!(tier.index(), i);
        }
    }
}
