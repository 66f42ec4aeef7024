//! Response Cache - Tiered HTTP response caching for the restaurant backend
//!
//! Caches successful JSON `GET` responses with short/medium/long TTL tiers,
//! in memory or in Redis, with statistics and pattern invalidation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheTier, Resource, ResponseCache};
pub use config::Config;
pub use middleware::{cache_response, CacheOptions, CallerId};
pub use tasks::spawn_sweep_tasks;
