//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer and its admin API.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing store could not be reached
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    /// Backing store did not answer in time
    #[error("Cache backend timed out during {0}")]
    Timeout(&'static str),

    /// Payload could not be encoded or decoded for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Payload exceeds the per-entry size ceiling
    #[error("Entry of {size} bytes exceeds maximum of {max} bytes")]
    EntryTooLarge { size: usize, max: usize },

    /// Key exceeds the maximum key length
    #[error("Key exceeds maximum length of {0} bytes")]
    KeyTooLong(usize),

    /// TTL must be at least one second
    #[error("Invalid TTL: {0} seconds")]
    InvalidTtl(u64),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unusable startup configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CacheError {
    /// True for errors caused by the backing store being unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::Unavailable(_) | CacheError::Timeout(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Unavailable(_) | CacheError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::InvalidRequest(_)
            | CacheError::KeyTooLong(_)
            | CacheError::InvalidTtl(_)
            | CacheError::EntryTooLarge { .. } => StatusCode::BAD_REQUEST,
            CacheError::Serialization(_) | CacheError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
