//! API Module
//!
//! HTTP handlers and routing: cached demo routes and the cache admin API.
//!
//! # Endpoints
//! - `GET /api/dishes`, `GET /api/dishes/:id`, `GET /api/user/:id` - Cached reads
//! - `POST /api/dishes` - Uncached write that invalidates dishes
//! - `GET /api/cache/stats` - Cache statistics
//! - `DELETE /api/cache` - Invalidate everything
//! - `POST /api/cache/invalidate[/:resource]` - Targeted invalidation
//! - `GET /health` - Health check endpoint

pub mod catalog;
pub mod handlers;
pub mod routes;

pub use catalog::Catalog;
pub use handlers::*;
pub use routes::create_router;
