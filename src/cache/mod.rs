//! Cache Module
//!
//! Two-tier caching: a bounded volatile tier in front of durable storage,
//! with TTL expiration, schema-version checks and pattern invalidation.

mod durable;
mod entry;
mod memory;
mod stats;
mod tiered;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use durable::{DurableStorage, DurableTier, FileStorage, MemoryStorage};
pub use entry::{CacheEntry, PersistedRecord};
pub use memory::{InsertOutcome, MemoryTier};
pub use stats::CacheStats;
pub use tiered::{Lookup, SetOptions, TierSelection, TieredCache};

// == Public Constants ==
/// Default TTL in milliseconds (5 minutes)
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

/// Default volatile tier capacity
pub const DEFAULT_MEMORY_CAPACITY: usize = 100;

/// Default durable key namespace
pub const DEFAULT_STORAGE_PREFIX: &str = "storefront_cache_";

/// Default durable sweep interval in seconds (10 minutes)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;
