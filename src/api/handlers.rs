//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::backend::StorefrontApi;
use crate::cache::TieredCache;
use crate::error::Result;
use crate::facade::CachedDataFacade;
use crate::models::{HealthResponse, InvalidateResponse, ListQuery, RefreshQuery, StatsResponse};

/// Application state shared across all handlers.
///
/// Holds the facade; the facade itself shares one cache instance.
#[derive(Clone)]
pub struct AppState {
    pub facade: CachedDataFacade,
}

impl AppState {
    /// Creates a new AppState around the given facade.
    pub fn new(facade: CachedDataFacade) -> Self {
        Self { facade }
    }

    /// Creates a new AppState from a cache and the backend it fronts.
    pub fn from_parts(cache: TieredCache, api: Arc<dyn StorefrontApi>) -> Self {
        let cache = Arc::new(tokio::sync::RwLock::new(cache));
        Self::new(CachedDataFacade::new(cache, api))
    }
}

/// Handler for GET /api/products
pub async fn products_handler(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Value>> {
    let query = ListQuery::from_map(raw);
    let options = query.options();
    let value = state.facade.fetch_products(query.params, options).await?;
    Ok(Json(value))
}

/// Handler for GET /api/products/:id
pub async fn product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<Value>> {
    let value = state.facade.fetch_product(&id, query.options()).await?;
    Ok(Json(value))
}

/// Handler for GET /api/categories
pub async fn categories_handler(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<Value>> {
    let value = state.facade.fetch_categories(query.options()).await?;
    Ok(Json(value))
}

/// Handler for GET /api/settings
pub async fn settings_handler(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<Value>> {
    let value = state.facade.fetch_settings(query.options()).await?;
    Ok(Json(value))
}

/// Handler for GET /api/search
pub async fn search_handler(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Value>> {
    let query = ListQuery::from_map(raw);
    let options = query.options();
    let value = state.facade.search_products(query.params, options).await?;
    Ok(Json(value))
}

/// Handler for GET /api/best-selling
pub async fn best_selling_handler(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Value>> {
    let query = ListQuery::from_map(raw);
    let options = query.options();
    let value = state.facade.fetch_best_selling(query.params, options).await?;
    Ok(Json(value))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<InvalidateResponse> {
    state.facade.clear_cache().await;
    Json(InvalidateResponse::cleared())
}

/// Handler for DELETE /cache/keys/:key
pub async fn invalidate_key_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<InvalidateResponse> {
    state.facade.invalidate(&key).await;
    Json(InvalidateResponse::key(&key))
}

/// Handler for DELETE /cache/patterns/:pattern
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.facade.invalidate_pattern(&pattern).await;
    Json(InvalidateResponse::pattern(&pattern, removed))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let facade = &state.facade;
    let version = facade.cache().read().await.version().to_string();

    Json(StatsResponse::new(
        facade.cache_stats().await,
        facade.in_flight_count(),
        version,
        facade.preload_status().await,
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
