//! API Module
//!
//! HTTP handlers and routing for the caching gateway.
//!
//! # Endpoints
//! - `GET /api/products`, `/api/products/:id`, `/api/categories`,
//!   `/api/settings`, `/api/search`, `/api/best-selling` - Cached reads
//! - `DELETE /cache`, `/cache/keys/:key`, `/cache/patterns/:pattern` - Invalidation
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
