//! Admin Handlers
//!
//! HTTP handlers for cache statistics, invalidation and health.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use super::catalog::Catalog;
use crate::cache::{Resource, ResponseCache, StatsReport};
use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, InvalidateRequest, InvalidateResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Response cache instance
    pub cache: ResponseCache,
    /// Demo data served by the cached routes
    pub catalog: Arc<Catalog>,
}

impl AppState {
    /// Creates a new AppState around `cache` with a seeded demo catalog.
    pub fn new(cache: ResponseCache) -> Self {
        Self {
            cache,
            catalog: Arc::new(Catalog::seeded()),
        }
    }
}

/// Handler for GET /api/cache/stats
///
/// Returns counters, hit rate and live key counts per tier.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsReport> {
    Json(state.cache.report().await)
}

/// Handler for DELETE /api/cache
pub async fn invalidate_all_handler(
    State(state): State<AppState>,
) -> Result<Json<InvalidateResponse>> {
    let removed = state.cache.invalidate_all().await?;
    Ok(Json(InvalidateResponse::new("all", removed)))
}

/// Handler for POST /api/cache/invalidate
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state
        .cache
        .invalidate_by_prefix(&req.pattern, req.tier())
        .await?;
    Ok(Json(InvalidateResponse::new(req.pattern, removed)))
}

/// Handler for POST /api/cache/invalidate/:resource
///
/// Accepts `dishes`, `orders`, `expenses`, `user:<id>` or any key substring.
pub async fn invalidate_resource_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let resource: Resource = match resource.parse() {
        Ok(resource) => resource,
        Err(never) => match never {},
    };

    let removed = state.cache.invalidate_resource(&resource).await?;
    Ok(Json(InvalidateResponse::new(resource.to_string(), removed)))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.backend().kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheTier;
    use crate::config::Config;

    fn state() -> AppState {
        AppState::new(ResponseCache::from_config(&Config::default()).unwrap())
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.backend, "memory");
        assert_eq!(response.stats.hits, 0);
        assert_eq!(response.keys.short, Some(0));
    }

    #[tokio::test]
    async fn test_invalidate_pattern_handler() {
        let state = state();
        state
            .cache
            .store(CacheTier::Short, "api:GET:/api/dishes", "[]", None)
            .await;

        let req = InvalidateRequest {
            pattern: "dishes".to_string(),
            tier: None,
        };
        let response = invalidate_pattern_handler(State(state), Json(req))
            .await
            .unwrap();
        assert_eq!(response.removed, 1);
    }

    #[tokio::test]
    async fn test_invalidate_pattern_rejects_empty() {
        let req = InvalidateRequest {
            pattern: "".to_string(),
            tier: None,
        };
        let result = invalidate_pattern_handler(State(state()), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_invalidate_resource_handler() {
        let state = state();
        state
            .cache
            .store(CacheTier::Short, "api:GET:/api/orders:user:7", "[]", None)
            .await;

        let response = invalidate_resource_handler(State(state), Path("user:7".to_string()))
            .await
            .unwrap();
        assert_eq!(response.target, "user:7");
        assert_eq!(response.removed, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler(State(state())).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.backend, "memory");
    }
}
