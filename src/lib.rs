//! Storefront Cache - Two-tier data cache for a storefront REST backend
//!
//! Provides a volatile + durable cache with TTL expiration, schema-version
//! invalidation and stale fallback, a facade binding storefront resources to
//! cache policies, and an HTTP gateway serving cached reads.

pub mod api;
pub mod backend;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod facade;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::TieredCache;
pub use config::Config;
pub use facade::{CachedDataFacade, FetchOptions};
pub use tasks::spawn_cleanup_task;
