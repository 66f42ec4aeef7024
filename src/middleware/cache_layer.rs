//! Response cache middleware.
//!
//! Serves `GET` responses from the cache and stores successful JSON
//! responses on the way out. Applied per route with
//! `axum::middleware::from_fn_with_state(route_cache, cache_response)`.

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{FromRequestParts, RawPathParams, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use futures::stream;
use tracing::{debug, error, instrument};

use crate::cache::{CacheTier, KeyRequest, ResponseCache, MAX_ENTRY_SIZE};
use crate::error::{CacheError, Result};

/// Response header carrying `HIT` or `MISS`.
pub const X_CACHE: &str = "x-cache";
/// Response header carrying the derived cache key.
pub const X_CACHE_KEY: &str = "x-cache-key";
/// Request header that skips the cache for one request.
pub const X_CACHE_BYPASS: &str = "x-cache-bypass";

// == Options ==
/// Per-route cache settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    pub tier: CacheTier,
    /// TTL in seconds overriding the tier default
    pub ttl: Option<u64>,
    /// Key namespace; defaults to `api`
    pub namespace: Option<String>,
}

impl CacheOptions {
    pub fn tier(tier: CacheTier) -> Self {
        Self {
            tier,
            ..Self::default()
        }
    }

    /// Selects a tier by name; unknown names fall back to `short`.
    pub fn named(tier: &str) -> Self {
        Self::tier(CacheTier::from_name(tier))
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl = Some(ttl_seconds);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Middleware state: the cache instance plus the route's options.
#[derive(Clone)]
pub struct RouteCache {
    pub cache: ResponseCache,
    pub options: CacheOptions,
}

impl ResponseCache {
    /// Binds this cache to a route's options, for use as middleware state.
    pub fn route(&self, options: CacheOptions) -> RouteCache {
        RouteCache {
            cache: self.clone(),
            options,
        }
    }
}

/// Authenticated caller, inserted into request extensions by the auth layer.
///
/// Requests carrying it get per-caller cache keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

/// What is written to the store: the status and the body text as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedResponse {
    status: u16,
    body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

// == Middleware ==
/// Caches successful JSON `GET` responses.
///
/// If the request future is dropped before the handler finishes, nothing
/// is written: the store call only happens after the full body is in hand.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn cache_response(
    State(route): State<RouteCache>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET || bypass_requested(request.headers()) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let key = request_key(&mut parts, route.options.namespace.as_deref()).await;
    let request = Request::from_parts(parts, body);
    let tier = route.options.tier;

    if let Some(payload) = route.cache.lookup(tier, &key).await {
        match hit_response(&payload, &key) {
            Ok(response) => {
                debug!(cache = tier.name(), outcome = "hit", key = %key, "serving cached response");
                return response;
            }
            Err(err) => {
                error!(key = %key, error = %err, "unreadable cache entry, executing handler");
            }
        }
    }

    debug!(cache = tier.name(), outcome = "miss", key = %key, "cache miss, executing handler");

    let response = next.run(request).await;
    let mut response = capture(&route, &key, response).await;
    mark(response.headers_mut(), CacheStatus::Miss, &key);
    response
}

/// Derives the key for a request from its URI, route params and caller.
async fn request_key(parts: &mut Parts, namespace: Option<&str>) -> String {
    let mut key = KeyRequest::new(parts.method.as_str(), parts.uri.path());

    if let Some(query) = parts.uri.query() {
        key = key.with_query(query);
    }
    // Only present when the middleware runs after routing
    if let Ok(params) = RawPathParams::from_request_parts(parts, &()).await {
        for (name, value) in params.iter() {
            key = key.with_param(name, value);
        }
    }
    if let Some(CallerId(caller)) = parts.extensions.get::<CallerId>() {
        key = key.with_caller(caller.clone());
    }
    if let Some(namespace) = namespace {
        key = key.with_namespace(namespace);
    }

    key.derive()
}

/// Stores the response body if it is cacheable and hands the response back.
async fn capture(route: &RouteCache, key: &str, response: Response) -> Response {
    if !response.status().is_success() || !is_json(response.headers()) {
        return response;
    }

    // Unknown length means a streaming body; leave it untouched
    let size = match response.body().size_hint().exact() {
        Some(size) if size as usize <= MAX_ENTRY_SIZE => size,
        Some(size) => {
            debug!(key, size, max = MAX_ENTRY_SIZE, "response too large to cache");
            return response;
        }
        None => return response,
    };

    let (parts, body) = response.into_parts();
    let bytes = match buffer(body).await {
        Ok(bytes) => bytes,
        Err(failed) => {
            error!(key, size, "failed to read response body, skipping cache");
            return Response::from_parts(parts, failed);
        }
    };

    match json_payload(parts.status, &bytes) {
        Ok(payload) => {
            route
                .cache
                .store(route.options.tier, key, &payload, route.options.ttl)
                .await;
        }
        Err(err) => {
            error!(key, error = %err, "response is not valid JSON, skipping cache");
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}

/// Reads a whole body. On a stream error the client still gets that error,
/// as a body that fails the same way.
async fn buffer(body: Body) -> std::result::Result<Bytes, Body> {
    // Size hint already checked; the store refuses oversized entries
    axum::body::to_bytes(body, usize::MAX).await.map_err(|err| {
        Body::from_stream(stream::iter([Err::<Bytes, _>(err)]))
    })
}

/// Validates a body as JSON and encodes it with its status for storage.
fn json_payload(status: StatusCode, bytes: &[u8]) -> Result<String> {
    serde_json::from_slice::<IgnoredAny>(bytes)?;
    let body = String::from_utf8(bytes.to_vec())
        .map_err(|e| CacheError::InvalidRequest(e.to_string()))?;

    Ok(serde_json::to_string(&CachedResponse {
        status: status.as_u16(),
        body,
    })?)
}

fn hit_response(payload: &str, key: &str) -> Result<Response> {
    let cached: CachedResponse = serde_json::from_str(payload)?;
    let status = StatusCode::from_u16(cached.status)
        .map_err(|e| CacheError::InvalidRequest(e.to_string()))?;

    let mut response = (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        cached.body,
    )
        .into_response();
    mark(response.headers_mut(), CacheStatus::Hit, key);
    Ok(response)
}

fn mark(headers: &mut HeaderMap, status: CacheStatus, key: &str) {
    headers.insert(X_CACHE, HeaderValue::from_static(status.as_str()));
    if let Ok(value) = HeaderValue::from_str(key) {
        headers.insert(X_CACHE_KEY, value);
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let mime = v.split(';').next().unwrap_or("").trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// `Cache-Control: no-cache|no-store` or `X-Cache-Bypass` opt out of caching.
fn bypass_requested(headers: &HeaderMap) -> bool {
    if headers.contains_key(X_CACHE_BYPASS) {
        return true;
    }
    headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|d| {
            let d = d.trim();
            d.eq_ignore_ascii_case("no-cache") || d.eq_ignore_ascii_case("no-store")
        })
}
