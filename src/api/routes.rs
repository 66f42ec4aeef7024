//! API Routes
//!
//! Configures the Axum router: cached demo routes plus the cache admin API.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::catalog::{create_dish, get_dish, get_user, list_dishes};
use super::handlers::{
    health_handler, invalidate_all_handler, invalidate_pattern_handler,
    invalidate_resource_handler, stats_handler, AppState,
};
use crate::cache::CacheTier;
use crate::middleware::{cache_response, identify_caller, CacheOptions};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/dishes` - Dish list, cached in the medium tier
/// - `POST /api/dishes` - Create a dish (never cached, drops cached dishes)
/// - `GET /api/dishes/:id` - One dish, cached in the medium tier
/// - `GET /api/user/:id` - User profile, cached in the short tier
/// - `GET /api/cache/stats` - Cache statistics
/// - `DELETE /api/cache` - Invalidate everything
/// - `POST /api/cache/invalidate` - Invalidate by key pattern
/// - `POST /api/cache/invalidate/:resource` - Invalidate a named resource
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - Cache: per route, after routing so path params feed the key
/// - Caller identity: `X-User-Id` becomes part of the key
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let dishes_cache = state.cache.route(CacheOptions::tier(CacheTier::Medium));
    let users_cache = state.cache.route(CacheOptions::tier(CacheTier::Short));

    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/dishes",
            get(list_dishes)
                .post(create_dish)
                .layer(from_fn_with_state(dishes_cache.clone(), cache_response)),
        )
        .route(
            "/api/dishes/:id",
            get(get_dish).layer(from_fn_with_state(dishes_cache, cache_response)),
        )
        .route(
            "/api/user/:id",
            get(get_user).layer(from_fn_with_state(users_cache, cache_response)),
        )
        .route("/api/cache/stats", get(stats_handler))
        .route("/api/cache", delete(invalidate_all_handler))
        .route("/api/cache/invalidate", post(invalidate_pattern_handler))
        .route(
            "/api/cache/invalidate/:resource",
            post(invalidate_resource_handler),
        )
        .route("/health", get(health_handler))
        .layer(from_fn(identify_caller))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
