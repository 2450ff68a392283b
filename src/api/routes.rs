//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    best_selling_handler, categories_handler, clear_handler, health_handler,
    invalidate_key_handler, invalidate_pattern_handler, product_handler, products_handler,
    search_handler, settings_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/products` - Product list (query params forwarded)
/// - `GET /api/products/:id` - Product detail
/// - `GET /api/categories` - Category list
/// - `GET /api/settings` - Site settings
/// - `GET /api/search` - Product search
/// - `GET /api/best-selling` - Best sellers
/// - `DELETE /cache` - Clear both tiers
/// - `DELETE /cache/keys/:key` - Invalidate one key
/// - `DELETE /cache/patterns/:pattern` - Invalidate keys containing a substring
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// Every read endpoint accepts `?refresh=true` to bypass the cached value.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/api/products", get(products_handler))
        .route("/api/products/:id", get(product_handler))
        .route("/api/categories", get(categories_handler))
        .route("/api/settings", get(settings_handler))
        .route("/api/search", get(search_handler))
        .route("/api/best-selling", get(best_selling_handler))
        .route("/cache", delete(clear_handler))
        .route("/cache/keys/:key", delete(invalidate_key_handler))
        .route("/cache/patterns/:pattern", delete(invalidate_pattern_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
