//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::cache::CacheTier;

/// Request body for pattern invalidation (POST /api/cache/invalidate)
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Substring of the cache keys to remove
    pub pattern: String,
    /// Restrict to one tier; all tiers when absent
    #[serde(default)]
    pub tier: Option<String>,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.pattern.trim().is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }

    /// Resolved tier; unknown names fall back to `short`.
    pub fn tier(&self) -> Option<CacheTier> {
        self.tier.as_deref().map(CacheTier::from_name)
    }
}

/// Request body for POST /api/dishes
#[derive(Debug, Clone, Deserialize)]
pub struct NewDish {
    pub name: String,
    pub category: String,
    /// Price in cents
    pub price: u32,
}

impl NewDish {
    pub fn validate(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("Dish name cannot be empty".to_string());
        }
        if self.category.trim().is_empty() {
            return Some("Dish category cannot be empty".to_string());
        }
        None
    }
}

/// Query string of GET /api/dishes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DishFilter {
    #[serde(default)]
    pub category: Option<String>,
}
