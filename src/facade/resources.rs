//! Resource binding table and mutation invalidation graph.
//!
//! Both are static configuration: every cached resource has one TTL and tier
//! policy, and every mutation invalidates a fixed set of keys and patterns.

use std::collections::HashMap;
use std::time::Duration;

use crate::facade::keys::CacheKey;

// == Resources ==
/// Logical resources the facade caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Products,
    Product,
    Categories,
    Settings,
    UserProfile,
    Wishlist,
    UserOrders,
    Search,
    BestSelling,
    Timer,
    BlackFriday,
    UserAddresses,
    PromoValidation,
}

impl Resource {
    pub const ALL: [Resource; 13] = [
        Resource::Products,
        Resource::Product,
        Resource::Categories,
        Resource::Settings,
        Resource::UserProfile,
        Resource::Wishlist,
        Resource::UserOrders,
        Resource::Search,
        Resource::BestSelling,
        Resource::Timer,
        Resource::BlackFriday,
        Resource::UserAddresses,
        Resource::PromoValidation,
    ];

    /// Name used in cache keys.
    pub fn name(self) -> &'static str {
        match self {
            Resource::Products => "products",
            Resource::Product => "product",
            Resource::Categories => "categories",
            Resource::Settings => "settings",
            Resource::UserProfile => "user_profile",
            Resource::Wishlist => "user_wishlist",
            Resource::UserOrders => "user_orders",
            Resource::Search => "search",
            Resource::BestSelling => "best_selling",
            Resource::Timer => "timer",
            Resource::BlackFriday => "black_friday",
            Resource::UserAddresses => "user_addresses",
            Resource::PromoValidation => "promo_validation",
        }
    }

    /// Key for the parameterless form of this resource.
    pub fn key(self) -> CacheKey {
        CacheKey::resource(self.name())
    }
}

// == Policies ==
/// Where a resource's values may be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierPolicy {
    /// Volatile and durable tiers
    Both,
    /// Volatile tier only; per-user data never persists across sessions
    MemoryOnly,
    /// Never read from or written to the cache
    Uncached,
}

/// TTL and tier policy for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePolicy {
    pub ttl: Duration,
    pub tier: TierPolicy,
}

impl ResourcePolicy {
    const fn minutes(minutes: u64, tier: TierPolicy) -> Self {
        Self {
            ttl: Duration::from_secs(minutes * 60),
            tier,
        }
    }

    /// TTL in milliseconds, saturating at `u64::MAX`.
    pub fn ttl_ms(&self) -> u64 {
        u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Resource → policy table, built once at startup.
#[derive(Debug, Clone)]
pub struct ResourceTable {
    policies: HashMap<Resource, ResourcePolicy>,
}

impl ResourceTable {
    /// The storefront's standard bindings.
    pub fn standard() -> Self {
        use TierPolicy::*;

        let policies = Resource::ALL
            .into_iter()
            .map(|resource| {
                let policy = match resource {
                    Resource::Products => ResourcePolicy::minutes(10, Both),
                    Resource::Product => ResourcePolicy::minutes(15, Both),
                    Resource::Categories => ResourcePolicy::minutes(30, Both),
                    Resource::Settings => ResourcePolicy::minutes(60, Both),
                    Resource::UserProfile => ResourcePolicy::minutes(5, MemoryOnly),
                    Resource::Wishlist => ResourcePolicy::minutes(2, MemoryOnly),
                    Resource::UserOrders => ResourcePolicy::minutes(1, MemoryOnly),
                    Resource::Search => ResourcePolicy::minutes(5, Both),
                    Resource::BestSelling => ResourcePolicy::minutes(10, Both),
                    Resource::Timer => ResourcePolicy::minutes(1, Both),
                    Resource::BlackFriday => ResourcePolicy::minutes(5, Both),
                    Resource::UserAddresses => ResourcePolicy::minutes(5, MemoryOnly),
                    Resource::PromoValidation => ResourcePolicy::minutes(0, Uncached),
                };
                (resource, policy)
            })
            .collect();

        Self { policies }
    }

    /// Replaces the policy for one resource.
    pub fn with_policy(mut self, resource: Resource, policy: ResourcePolicy) -> Self {
        self.policies.insert(resource, policy);
        self
    }

    pub fn policy(&self, resource: Resource) -> ResourcePolicy {
        self.policies
            .get(&resource)
            .copied()
            .unwrap_or(ResourcePolicy::minutes(5, TierPolicy::Both))
    }
}

impl Default for ResourceTable {
    fn default() -> Self {
        Self::standard()
    }
}

// == Mutations ==
/// Write operations that change cached resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    ToggleProduct,
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
    MergeCategories,
    UpdateSettings,
    UpdateHero,
    AddToWishlist,
    RemoveFromWishlist,
    AddAddress,
    UpdateAddress,
    DeleteAddress,
    SetDefaultAddress,
    UpdateProfile,
}

/// One step of a mutation's invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// The detail key of the mutated product, when an id is known
    ProductDetail,
    /// The exact parameterless key of a resource
    Key(Resource),
    /// Every key containing the substring
    Pattern(&'static str),
}

const PRODUCT_VIEWS: &[Invalidation] = &[
    Invalidation::ProductDetail,
    Invalidation::Pattern("products"),
    Invalidation::Pattern("best_selling"),
    Invalidation::Pattern("search"),
];

// Products embed category names
const CATEGORY_VIEWS: &[Invalidation] = &[
    Invalidation::Pattern("categories"),
    Invalidation::Pattern("products"),
];

const SETTINGS_VIEWS: &[Invalidation] = &[
    Invalidation::Pattern("settings"),
    Invalidation::Pattern("timer"),
    Invalidation::Pattern("black_friday"),
];

impl Mutation {
    /// What this mutation invalidates once it succeeds.
    pub fn invalidations(self) -> &'static [Invalidation] {
        match self {
            Mutation::CreateProduct
            | Mutation::UpdateProduct
            | Mutation::DeleteProduct
            | Mutation::ToggleProduct => PRODUCT_VIEWS,
            Mutation::CreateCategory
            | Mutation::UpdateCategory
            | Mutation::DeleteCategory
            | Mutation::MergeCategories => CATEGORY_VIEWS,
            Mutation::UpdateSettings | Mutation::UpdateHero => SETTINGS_VIEWS,
            Mutation::AddToWishlist | Mutation::RemoveFromWishlist => {
                &[Invalidation::Key(Resource::Wishlist)]
            }
            Mutation::AddAddress
            | Mutation::UpdateAddress
            | Mutation::DeleteAddress
            | Mutation::SetDefaultAddress => &[Invalidation::Key(Resource::UserAddresses)],
            Mutation::UpdateProfile => &[Invalidation::Key(Resource::UserProfile)],
        }
    }
}
