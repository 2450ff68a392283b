//! Cache Statistics Module
//!
//! Tracks per-tier entry counts and cache performance metrics.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries currently held by the volatile tier
    pub memory_entries: usize,
    /// Entries currently held by the durable tier
    pub durable_entries: usize,
    /// Reads answered with a fresh value
    pub hits: u64,
    /// Reads that found nothing usable
    pub misses: u64,
    /// Reads answered with an expired value (stale fallback)
    pub stale_hits: u64,
    /// Durable entries copied into the volatile tier on read
    pub promotions: u64,
    /// Volatile entries dropped because the tier was full
    pub evictions: u64,
    /// Durable writes that failed and degraded to memory only
    pub durable_write_failures: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    /// Stale hits are not counted.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_stale_hit(&mut self) {
        self.stale_hits += 1;
    }

    pub fn record_promotion(&mut self) {
        self.promotions += 1;
    }

    // == Record Evictions ==
    /// Adds `count` to the eviction counter.
    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_durable_write_failure(&mut self) {
        self.durable_write_failures += 1;
    }

    // == Update Entry Counts ==
    /// Updates the per-tier entry counts.
    pub fn set_entry_counts(&mut self, memory: usize, durable: usize) {
        self.memory_entries = memory;
        self.durable_entries = durable;
    }
}
