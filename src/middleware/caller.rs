//! Caller identity middleware.
//!
//! Stand-in for the host application's auth layer: it trusts the
//! `X-User-Id` header and records it as a [`CallerId`] extension so cached
//! responses are keyed per caller.

use axum::{extract::Request, middleware::Next, response::Response};

use super::CallerId;

/// Request header naming the authenticated caller.
pub const X_USER_ID: &str = "x-user-id";

pub async fn identify_caller(mut request: Request, next: Next) -> Response {
    let caller = request
        .headers()
        .get(X_USER_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    if let Some(caller) = caller {
        request.extensions_mut().insert(CallerId(caller));
    }

    next.run(request).await
}
