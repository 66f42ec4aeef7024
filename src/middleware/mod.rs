//! Middleware Module
//!
//! Request/response interception for the cache layer.
//!
//! # Layers
//! - `cache_response` - Serves and stores cached JSON responses per route
//! - `identify_caller` - Maps the `X-User-Id` header to a [`CallerId`]

mod cache_layer;
mod caller;

pub use cache_layer::{
    cache_response, CacheOptions, CallerId, RouteCache, X_CACHE, X_CACHE_BYPASS, X_CACHE_KEY,
};
pub use caller::{identify_caller, X_USER_ID};
