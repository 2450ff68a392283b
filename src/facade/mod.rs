//! Cached Data Facade
//!
//! Binds named storefront resources to cache keys and TTL policies, and runs
//! the read-through / write-invalidate protocol around the backend.
//!
//! Reads return a fresh cached value without touching the backend. On a miss
//! the backend is called once per key, however many callers are waiting, and
//! the result is cached. If the backend fails and an expired value is still
//! cached, that value is returned instead of the error.

mod inflight;
pub mod keys;
mod preload;
pub mod resources;

use std::future::Future;
use std::sync::Arc;

use futures::future::FutureExt;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::backend::{MutationRequest, ResourceArgs, StorefrontApi};
use crate::cache::{CacheStats, SetOptions, TierSelection, TieredCache};
use crate::error::{ApiError, Result};

pub use inflight::InFlight;
pub use keys::{CacheKey, Params};
pub use preload::PreloadStatus;
pub use resources::{Invalidation, Mutation, Resource, ResourcePolicy, ResourceTable, TierPolicy};

// == Fetch Options ==
/// Per-call cache behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip the cache read, always fetch, then repopulate
    pub force_refresh: bool,
    /// Write the result to the volatile tier only
    pub memory_only: bool,
    /// Bypass the cache entirely, read and write
    pub skip_cache: bool,
}

impl FetchOptions {
    pub fn force_refresh() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }

    pub fn memory_only() -> Self {
        Self {
            memory_only: true,
            ..Self::default()
        }
    }

    pub fn skip_cache() -> Self {
        Self {
            skip_cache: true,
            ..Self::default()
        }
    }
}

// == Cached Data Facade ==
/// Cache-aware access to the storefront backend.
///
/// Cloning is cheap; clones share the cache, the in-flight map and the
/// preload status.
#[derive(Clone)]
pub struct CachedDataFacade {
    cache: Arc<RwLock<TieredCache>>,
    api: Arc<dyn StorefrontApi>,
    resources: Arc<ResourceTable>,
    in_flight: InFlight,
    preload_status: Arc<RwLock<PreloadStatus>>,
}

impl CachedDataFacade {
    // == Constructor ==
    pub fn new(cache: Arc<RwLock<TieredCache>>, api: Arc<dyn StorefrontApi>) -> Self {
        Self::with_resources(cache, api, ResourceTable::standard())
    }

    /// Creates a facade with a custom resource table.
    pub fn with_resources(
        cache: Arc<RwLock<TieredCache>>,
        api: Arc<dyn StorefrontApi>,
        resources: ResourceTable,
    ) -> Self {
        Self {
            cache,
            api,
            resources: Arc::new(resources),
            in_flight: InFlight::new(),
            preload_status: Arc::new(RwLock::new(PreloadStatus::Pending)),
        }
    }

    /// The shared cache behind this facade.
    pub fn cache(&self) -> &Arc<RwLock<TieredCache>> {
        &self.cache
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    // == Read Through ==
    /// Returns the cached value for `key`, or fetches, caches and returns it.
    ///
    /// On fetch failure an expired cached value is returned if one exists;
    /// otherwise the fetch error is returned unchanged.
    ///
    /// Callers joining a fetch already in flight share its result. If any of
    /// them asked for memory-only storage, the value ends up memory-only.
    pub async fn cached_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        fetch: F,
        policy: ResourcePolicy,
        options: FetchOptions,
    ) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        if options.skip_cache || policy.tier == TierPolicy::Uncached {
            return fetch().await;
        }

        if !options.force_refresh {
            // Expired entries stay in place for the fallback below
            if let Some(found) = self.cache.write().await.lookup(key.as_str()) {
                if found.fresh {
                    debug!("Cache hit for {}", key);
                    return Ok(found.value);
                }
            }
        }

        let tiers = if options.memory_only || policy.tier == TierPolicy::MemoryOnly {
            TierSelection::MemoryOnly
        } else {
            TierSelection::Both
        };
        let set_options = SetOptions {
            ttl_ms: Some(policy.ttl_ms()),
            tiers,
        };

        let (shared, leader) = self.in_flight.join_or_start(key.as_str(), || {
            self.spawn_fetch(key.as_str().to_string(), fetch(), set_options)
        });
        if !leader {
            debug!("Joining in-flight fetch for {}", key);
        }

        match shared.await {
            Ok(value) => {
                // The leader's tiers were written; a memory-only joiner narrows them
                if !leader && tiers == TierSelection::MemoryOnly {
                    self.cache
                        .write()
                        .await
                        .set(key.as_str(), value.clone(), set_options);
                }
                Ok(value)
            }
            Err(err) => match self.cache.write().await.get_stale(key.as_str()) {
                Some(stale) => {
                    warn!("Serving stale {} after fetch failure: {}", key, err);
                    Ok(stale)
                }
                None => Err(err),
            },
        }
    }

    /// Runs `fetch` as its own task which caches a successful result.
    ///
    /// Because the task owns the cache write, callers that stop waiting do
    /// not prevent it.
    fn spawn_fetch<Fut>(
        &self,
        key: String,
        fetch: Fut,
        set_options: SetOptions,
    ) -> futures::future::BoxFuture<'static, Result<Value>>
    where
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let cache = self.cache.clone();
        let in_flight = self.in_flight.clone();

        let task = tokio::spawn(async move {
            debug!("Cache miss for {}, fetching", key);
            let result = fetch.await;
            if let Ok(value) = &result {
                cache.write().await.set(&key, value.clone(), set_options);
            }
            in_flight.finish(&key);
            result
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(ApiError::Internal(format!("fetch task failed: {}", e))))
        }
        .boxed()
    }

    /// Reads a bound resource through the cache.
    pub async fn read(
        &self,
        resource: Resource,
        args: ResourceArgs,
        options: FetchOptions,
    ) -> Result<Value> {
        let key = match &args {
            ResourceArgs::None => resource.key(),
            ResourceArgs::Id(id) => CacheKey::with_id(resource.name(), id),
            ResourceArgs::Params(params) => CacheKey::with_params(resource.name(), params),
        };
        let policy = self.resources.policy(resource);
        let api = self.api.clone();

        self.cached_fetch(
            &key,
            move || async move { api.fetch(resource, &args).await },
            policy,
            options,
        )
        .await
    }

    // == Read Accessors ==
    pub async fn fetch_products(&self, params: Params, options: FetchOptions) -> Result<Value> {
        self.read(Resource::Products, ResourceArgs::Params(params), options)
            .await
    }

    pub async fn fetch_product(&self, id: &str, options: FetchOptions) -> Result<Value> {
        self.read(Resource::Product, ResourceArgs::id(id), options)
            .await
    }

    pub async fn fetch_categories(&self, options: FetchOptions) -> Result<Value> {
        self.read(Resource::Categories, ResourceArgs::None, options)
            .await
    }

    pub async fn fetch_settings(&self, options: FetchOptions) -> Result<Value> {
        self.read(Resource::Settings, ResourceArgs::None, options)
            .await
    }

    pub async fn fetch_user_profile(&self, options: FetchOptions) -> Result<Value> {
        self.read(Resource::UserProfile, ResourceArgs::None, options)
            .await
    }

    pub async fn fetch_wishlist(&self, options: FetchOptions) -> Result<Value> {
        self.read(Resource::Wishlist, ResourceArgs::None, options)
            .await
    }

    pub async fn fetch_user_orders(&self, options: FetchOptions) -> Result<Value> {
        self.read(Resource::UserOrders, ResourceArgs::None, options)
            .await
    }

    pub async fn search_products(&self, params: Params, options: FetchOptions) -> Result<Value> {
        self.read(Resource::Search, ResourceArgs::Params(params), options)
            .await
    }

    pub async fn fetch_best_selling(&self, params: Params, options: FetchOptions) -> Result<Value> {
        self.read(Resource::BestSelling, ResourceArgs::Params(params), options)
            .await
    }

    pub async fn fetch_timer(&self, options: FetchOptions) -> Result<Value> {
        self.read(Resource::Timer, ResourceArgs::None, options).await
    }

    pub async fn fetch_black_friday(&self, options: FetchOptions) -> Result<Value> {
        self.read(Resource::BlackFriday, ResourceArgs::None, options)
            .await
    }

    pub async fn fetch_user_addresses(&self, options: FetchOptions) -> Result<Value> {
        self.read(Resource::UserAddresses, ResourceArgs::None, options)
            .await
    }

    /// Checks a promo code against its usage counter. Never cached.
    pub async fn validate_promo_code(&self, code: &str) -> Result<Value> {
        let mut params = Params::new();
        params.insert("code".to_string(), code.to_string());
        self.read(
            Resource::PromoValidation,
            ResourceArgs::Params(params),
            FetchOptions::skip_cache(),
        )
        .await
    }

    // == Mutations ==
    /// Sends a mutation, then invalidates what it affects.
    ///
    /// Nothing is invalidated when the backend rejects the mutation.
    pub async fn mutate(&self, request: MutationRequest) -> Result<Value> {
        let result = self.api.mutate(&request).await?;
        self.apply_invalidations(request.mutation, request.target.as_deref())
            .await;
        Ok(result)
    }

    async fn apply_invalidations(&self, mutation: Mutation, target: Option<&str>) {
        let mut cache = self.cache.write().await;
        for invalidation in mutation.invalidations() {
            match invalidation {
                Invalidation::ProductDetail => {
                    if let Some(id) = target {
                        cache.invalidate(CacheKey::with_id(Resource::Product.name(), id).as_str());
                    }
                }
                Invalidation::Key(resource) => cache.invalidate(resource.key().as_str()),
                Invalidation::Pattern(pattern) => {
                    cache.invalidate_pattern(pattern);
                }
            }
        }
        debug!("Applied invalidations for {:?}", mutation);
    }

    pub async fn add_product(&self, product: Value) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::CreateProduct).body(product))
            .await
    }

    pub async fn update_product(&self, id: &str, product: Value) -> Result<Value> {
        self.mutate(
            MutationRequest::new(Mutation::UpdateProduct)
                .target(id)
                .body(product),
        )
        .await
    }

    pub async fn delete_product(&self, id: &str) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::DeleteProduct).target(id))
            .await
    }

    pub async fn toggle_product(&self, id: &str) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::ToggleProduct).target(id))
            .await
    }

    pub async fn add_category(&self, category: Value) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::CreateCategory).body(category))
            .await
    }

    pub async fn update_category(&self, id: &str, category: Value) -> Result<Value> {
        self.mutate(
            MutationRequest::new(Mutation::UpdateCategory)
                .target(id)
                .body(category),
        )
        .await
    }

    pub async fn delete_category(&self, id: &str) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::DeleteCategory).target(id))
            .await
    }

    /// Merges categories; `request` names the source and target categories.
    pub async fn merge_categories(&self, request: Value) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::MergeCategories).body(request))
            .await
    }

    pub async fn update_settings(&self, settings: Value) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::UpdateSettings).body(settings))
            .await
    }

    pub async fn update_hero(&self, hero: Value) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::UpdateHero).body(hero))
            .await
    }

    pub async fn add_to_wishlist(&self, product_id: &str) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::AddToWishlist).target(product_id))
            .await
    }

    pub async fn remove_from_wishlist(&self, product_id: &str) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::RemoveFromWishlist).target(product_id))
            .await
    }

    pub async fn add_address(&self, address: Value) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::AddAddress).body(address))
            .await
    }

    pub async fn update_address(&self, id: &str, address: Value) -> Result<Value> {
        self.mutate(
            MutationRequest::new(Mutation::UpdateAddress)
                .target(id)
                .body(address),
        )
        .await
    }

    pub async fn delete_address(&self, id: &str) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::DeleteAddress).target(id))
            .await
    }

    pub async fn set_default_address(&self, id: &str) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::SetDefaultAddress).target(id))
            .await
    }

    pub async fn update_profile(&self, profile: Value) -> Result<Value> {
        self.mutate(MutationRequest::new(Mutation::UpdateProfile).body(profile))
            .await
    }

    // == Cache Administration ==
    pub async fn invalidate(&self, key: &str) {
        self.cache.write().await.invalidate(key);
    }

    /// Returns the number of entries removed across tiers.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        self.cache.write().await.invalidate_pattern(pattern)
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }

    /// Number of fetches currently shared between callers.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

impl std::fmt::Debug for CachedDataFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedDataFacade")
            .field("resources", &self.resources)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}
