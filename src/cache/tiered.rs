//! Tiered Cache Module
//!
//! Main cache engine presenting a volatile tier and a durable tier as one
//! logical cache with TTL expiration, promotion and pattern invalidation.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, DurableStorage, DurableTier, MemoryTier};
use crate::clock::Clock;
use crate::config::Config;

// == Tier Selection ==
/// Which tiers a `set` writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TierSelection {
    #[default]
    Both,
    /// Volatile tier only; the value never reaches durable storage
    MemoryOnly,
    /// Durable tier only
    DurableOnly,
}

// == Set Options ==
/// Options for [`TieredCache::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// TTL in milliseconds, cache default when `None`
    pub ttl_ms: Option<u64>,
    pub tiers: TierSelection,
}

impl SetOptions {
    pub fn with_ttl_ms(ttl_ms: u64) -> Self {
        Self {
            ttl_ms: Some(ttl_ms),
            ..Self::default()
        }
    }

    pub fn memory_only(mut self) -> Self {
        self.tiers = TierSelection::MemoryOnly;
        self
    }

    pub fn durable_only(mut self) -> Self {
        self.tiers = TierSelection::DurableOnly;
        self
    }
}

// == Lookup ==
/// A cached value together with its freshness.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub value: Value,
    /// False when the entry is past its expiry
    pub fresh: bool,
}

// == Tiered Cache ==
/// Two-tier cache: a bounded in-process map in front of durable storage.
///
/// Reads check the volatile tier first, then the durable tier, promoting
/// durable hits into memory. Expired and version-mismatched entries are
/// removed lazily as they are read.
#[derive(Debug)]
pub struct TieredCache {
    memory: MemoryTier,
    durable: DurableTier,
    clock: Arc<dyn Clock>,
    /// Default TTL in milliseconds for entries without explicit TTL
    default_ttl_ms: u64,
    stats: CacheStats,
}

impl TieredCache {
    // == Constructor ==
    /// Creates a cache over `durable` and sweeps stale durable records.
    ///
    /// # Arguments
    /// * `durable` - Namespaced, versioned durable storage
    /// * `memory_capacity` - Maximum number of volatile entries
    /// * `default_ttl_ms` - TTL for entries set without one
    /// * `clock` - Time source for expiry
    pub fn new(
        durable: DurableTier,
        memory_capacity: usize,
        default_ttl_ms: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut cache = Self {
            memory: MemoryTier::new(memory_capacity),
            durable,
            clock,
            default_ttl_ms,
            stats: CacheStats::new(),
        };
        let removed = cache.sweep_durable();
        info!(
            "Tiered cache ready: version={}, capacity={}, swept {} durable entries",
            cache.durable.version(),
            cache.memory.capacity(),
            removed
        );
        cache
    }

    /// Creates a cache from configuration over the given storage.
    pub fn from_config(
        config: &Config,
        storage: Box<dyn DurableStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let durable = DurableTier::new(
            storage,
            config.storage_prefix.clone(),
            config.cache_version.clone(),
        );
        Self::new(
            durable,
            config.max_memory_entries,
            config.default_ttl.saturating_mul(1000),
            clock,
        )
    }

    // == Get ==
    /// Retrieves a fresh value by key.
    ///
    /// Expired entries are removed from their tier and read as absent.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        match self.read(key, false) {
            Some(found) => {
                self.stats.record_hit();
                Some(found.value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Retrieves a value by key, accepting an expired one.
    ///
    /// Version-mismatched durable entries are still treated as absent.
    pub fn get_stale(&mut self, key: &str) -> Option<Value> {
        match self.read(key, true) {
            Some(found) => {
                if found.fresh {
                    self.stats.record_hit();
                } else {
                    self.stats.record_stale_hit();
                }
                Some(found.value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Retrieves a value and whether it is still fresh, leaving expired
    /// entries in place so they remain available to [`get_stale`](Self::get_stale).
    pub fn lookup(&mut self, key: &str) -> Option<Lookup> {
        let found = self.read(key, true);
        match &found {
            Some(found) if found.fresh => self.stats.record_hit(),
            _ => self.stats.record_miss(),
        }
        found
    }

    fn read(&mut self, key: &str, allow_stale: bool) -> Option<Lookup> {
        let now = self.clock.now_ms();

        let mut stale_in_memory = None;
        if let Some(entry) = self.memory.get(key) {
            if !entry.is_expired_at(now) {
                return Some(Lookup {
                    value: entry.value.clone(),
                    fresh: true,
                });
            }
            if allow_stale {
                stale_in_memory = Some(entry.value.clone());
            } else {
                self.memory.remove(key);
            }
        }

        match self.durable.read(key, now, allow_stale) {
            Some(entry) if !entry.is_expired_at(now) || stale_in_memory.is_none() => {
                let fresh = !entry.is_expired_at(now);
                let value = entry.value.clone();
                self.promote(entry, now);
                Some(Lookup { value, fresh })
            }
            _ => stale_in_memory.map(|value| Lookup {
                value,
                fresh: false,
            }),
        }
    }

    /// Copies a durable entry into the volatile tier, keeping its timestamps.
    fn promote(&mut self, entry: CacheEntry, now: u64) {
        debug!("Promoting durable entry {} to memory", entry.key);
        let outcome = self.memory.insert(entry, now);
        self.stats.record_promotion();
        self.stats.record_evictions(outcome.evicted);
    }

    // == Set ==
    /// Stores a value, overwriting any prior entry under the same key.
    ///
    /// Durable write failures are logged and the value is kept in memory
    /// instead. A tier left out by `options.tiers` has the key removed, so
    /// reads never see an older value from it.
    pub fn set(&mut self, key: &str, value: Value, options: SetOptions) {
        let now = self.clock.now_ms();
        let ttl_ms = options.ttl_ms.unwrap_or(self.default_ttl_ms);
        let entry = CacheEntry::new(key, value, ttl_ms, now, self.durable.version());

        let mut write_memory = options.tiers != TierSelection::DurableOnly;
        if options.tiers == TierSelection::MemoryOnly {
            self.durable.remove(key);
        } else if let Err(e) = self.durable.write(&entry) {
            warn!(
                "Durable cache write failed for {}, keeping it in memory only: {}",
                key, e
            );
            self.stats.record_durable_write_failure();
            write_memory = true;
        }

        if write_memory {
            let outcome = self.memory.insert(entry, now);
            if outcome.evicted > 0 || outcome.expired > 0 {
                debug!(
                    "Memory tier full: dropped {} expired and evicted {} entries",
                    outcome.expired, outcome.evicted
                );
            }
            self.stats.record_evictions(outcome.evicted);
        } else {
            self.memory.remove(key);
        }
    }

    // == Invalidate ==
    /// Removes a key from both tiers. Absent keys are ignored.
    pub fn invalidate(&mut self, key: &str) {
        self.memory.remove(key);
        self.durable.remove(key);
        debug!("Invalidated {}", key);
    }

    /// Removes every key containing `pattern` from both tiers.
    ///
    /// Returns the number of entries removed across tiers.
    pub fn invalidate_pattern(&mut self, pattern: &str) -> usize {
        let removed = self.memory.remove_matching(pattern) + self.durable.remove_matching(pattern);
        debug!("Invalidated {} entries matching '{}'", removed, pattern);
        removed
    }

    // == Clear ==
    /// Removes all entries from both tiers.
    pub fn clear(&mut self) {
        self.memory.clear();
        let removed = self.durable.clear();
        info!("Cache cleared ({} durable entries removed)", removed);
    }

    // == Stats ==
    /// Returns per-tier entry counts and counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_entry_counts(self.memory.len(), self.durable.len());
        stats
    }

    // == Sweep ==
    /// Removes expired, version-mismatched and corrupt durable entries.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_durable(&mut self) -> usize {
        self.durable.sweep(self.clock.now_ms())
    }

    /// True if the volatile tier holds `key`, expired or not.
    pub fn in_memory(&self, key: &str) -> bool {
        self.memory.contains(key)
    }

    pub fn version(&self) -> &str {
        self.durable.version()
    }

    pub fn default_ttl_ms(&self) -> u64 {
        self.default_ttl_ms
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStorage, DEFAULT_TTL_MS};
    use crate::clock::ManualClock;
    use serde_json::json;

    const VERSION: &str = "1.0.0";

    fn cache_with(
        storage: &MemoryStorage,
        capacity: usize,
        version: &str,
    ) -> (TieredCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let durable = DurableTier::new(Box::new(storage.clone()), "sf_", version);
        let cache = TieredCache::new(durable, capacity, DEFAULT_TTL_MS, clock.clone());
        (cache, clock)
    }

    fn cache() -> (TieredCache, MemoryStorage, Arc<ManualClock>) {
        let storage = MemoryStorage::new();
        let (cache, clock) = cache_with(&storage, 100, VERSION);
        (cache, storage, clock)
    }

    #[test]
    fn test_huge_configured_ttl_saturates() {
        let config = Config {
            default_ttl: u64::MAX,
            ..Config::default()
        };
        let cache = TieredCache::from_config(
            &config,
            Box::new(MemoryStorage::new()),
            Arc::new(ManualClock::new(0)),
        );
        assert_eq!(cache.default_ttl_ms(), u64::MAX);
    }

    #[test]
    fn test_set_and_get() {
        let (mut cache, storage, _) = cache();

        cache.set("api_settings", json!({"name": "shop"}), SetOptions::default());

        assert_eq!(cache.get("api_settings"), Some(json!({"name": "shop"})));
        assert_eq!(storage.len(), 1);
        assert!(cache.in_memory("api_settings"));
    }

    #[test]
    fn test_get_nonexistent() {
        let (mut cache, _, _) = cache();
        assert_eq!(cache.get("missing"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_overwrite() {
        let (mut cache, _, _) = cache();

        cache.set("k", json!(1), SetOptions::default());
        cache.set("k", json!(2), SetOptions::default());

        assert_eq!(cache.get("k"), Some(json!(2)));
        let stats = cache.stats();
        assert_eq!(stats.memory_entries, 1);
        assert_eq!(stats.durable_entries, 1);
    }

    #[test]
    fn test_default_ttl_applied() {
        let (mut cache, _, clock) = cache();
        cache.set("k", json!(1), SetOptions::default());

        clock.advance(DEFAULT_TTL_MS);
        assert!(cache.get("k").is_some());

        clock.advance(1);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_expired_read_removes_from_both_tiers() {
        let (mut cache, storage, clock) = cache();
        cache.set("k", json!(1), SetOptions::with_ttl_ms(1_000));

        clock.advance(1_001);

        assert!(cache.get("k").is_none());
        assert!(!cache.in_memory("k"));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_get_stale_returns_expired_value() {
        let (mut cache, storage, clock) = cache();
        cache.set("k", json!("old"), SetOptions::with_ttl_ms(1_000));

        clock.advance(5_000);

        assert_eq!(cache.get_stale("k"), Some(json!("old")));
        assert_eq!(cache.stats().stale_hits, 1);
        assert_eq!(storage.len(), 1, "Stale reads keep the entry");
    }

    #[test]
    fn test_lookup_reports_freshness() {
        let (mut cache, _, clock) = cache();
        cache.set("k", json!(1), SetOptions::with_ttl_ms(1_000));

        assert_eq!(
            cache.lookup("k"),
            Some(Lookup {
                value: json!(1),
                fresh: true
            })
        );

        clock.advance(2_000);
        assert_eq!(
            cache.lookup("k"),
            Some(Lookup {
                value: json!(1),
                fresh: false
            })
        );
        assert_eq!(cache.get_stale("k"), Some(json!(1)));
    }

    #[test]
    fn test_durable_hit_promotes_to_memory() {
        let storage = MemoryStorage::new();
        {
            let (mut first, _) = cache_with(&storage, 100, VERSION);
            first.set("api_categories", json!(["shoes"]), SetOptions::default());
        }

        // New process: empty memory tier over the same durable storage
        let (mut second, _) = cache_with(&storage, 100, VERSION);
        assert!(!second.in_memory("api_categories"));

        assert_eq!(second.get("api_categories"), Some(json!(["shoes"])));
        assert!(second.in_memory("api_categories"));
        assert_eq!(second.stats().promotions, 1);
    }

    #[test]
    fn test_stale_durable_entry_promoted_on_stale_read() {
        let storage = MemoryStorage::new();
        let clock = Arc::new(ManualClock::new(0));
        let durable = DurableTier::new(Box::new(storage.clone()), "sf_", VERSION);
        let mut cache = TieredCache::new(durable, 100, DEFAULT_TTL_MS, clock.clone());
        cache.set("k", json!(1), SetOptions::with_ttl_ms(100).durable_only());

        clock.advance(500);

        assert_eq!(cache.get_stale("k"), Some(json!(1)));
        assert!(cache.in_memory("k"));
        assert!(cache.get("k").is_none(), "Promoted entry keeps its expiry");
    }

    #[test]
    fn test_memory_only_not_persisted() {
        let (mut cache, storage, _) = cache();

        cache.set("api_user_profile", json!({"id": 7}), SetOptions::default().memory_only());

        assert!(storage.is_empty());
        assert_eq!(cache.get("api_user_profile"), Some(json!({"id": 7})));
    }

    #[test]
    fn test_memory_only_write_drops_durable_copy() {
        let (mut cache, storage, _) = cache();
        cache.set("k", json!(1), SetOptions::default());

        cache.set("k", json!(2), SetOptions::default().memory_only());

        assert!(storage.is_empty());
        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[test]
    fn test_durable_only_write_skips_memory() {
        let (mut cache, storage, _) = cache();
        cache.set("k", json!(1), SetOptions::default());

        cache.set("k", json!(2), SetOptions::default().durable_only());

        assert!(!cache.in_memory("k"));
        assert_eq!(storage.len(), 1);
        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[test]
    fn test_version_mismatch_forces_miss() {
        let storage = MemoryStorage::new();
        {
            let (mut old, _) = cache_with(&storage, 100, "1.0.0");
            old.set("api_settings", json!({"v": 1}), SetOptions::default());
        }
        assert_eq!(storage.len(), 1);

        let clock = Arc::new(ManualClock::new(1_000_000));
        let durable = DurableTier::new(Box::new(storage.clone()), "sf_", "2.0.0");
        // Constructing runs the startup sweep, which already drops the entry
        let mut upgraded = TieredCache::new(durable, 100, DEFAULT_TTL_MS, clock);

        assert!(storage.is_empty());
        assert!(upgraded.get("api_settings").is_none());
    }

    #[test]
    fn test_durable_quota_falls_back_to_memory() {
        let storage = MemoryStorage::with_quota(8);
        let (mut cache, _) = cache_with(&storage, 100, VERSION);

        cache.set("big", json!("a long payload"), SetOptions::default().durable_only());

        assert!(storage.is_empty());
        assert_eq!(cache.get("big"), Some(json!("a long payload")));
        assert_eq!(cache.stats().durable_write_failures, 1);
    }

    #[test]
    fn test_disabled_storage_degrades_silently() {
        let storage = MemoryStorage::new();
        storage.set_disabled(true);
        let (mut cache, _) = cache_with(&storage, 100, VERSION);

        cache.set("k", json!(1), SetOptions::default());
        cache.invalidate_pattern("k");
        cache.set("k", json!(2), SetOptions::default());

        assert_eq!(cache.get("k"), Some(json!(2)));
        assert_eq!(cache.stats().durable_entries, 0);
    }

    #[test]
    fn test_invalidate() {
        let (mut cache, storage, _) = cache();
        cache.set("a", json!(1), SetOptions::default());
        cache.set("b", json!(2), SetOptions::default());

        cache.invalidate("a");

        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_invalidate_absent_key_is_noop() {
        let (mut cache, _, _) = cache();
        cache.set("b", json!(2), SetOptions::default());

        cache.invalidate("missing");
        cache.invalidate("missing");

        assert_eq!(cache.get("b"), Some(json!(2)));
    }

    #[test]
    fn test_invalidate_pattern() {
        let (mut cache, _, _) = cache();
        cache.set("api_products_page=1", json!(1), SetOptions::default());
        cache.set("api_products_page=2", json!(2), SetOptions::default().memory_only());
        cache.set("api_categories_x", json!(3), SetOptions::default());
        cache.set("api_settings", json!(4), SetOptions::default());

        let removed = cache.invalidate_pattern("products");

        // page=1 lives in both tiers, page=2 in memory only
        assert_eq!(removed, 3);
        assert!(cache.get("api_products_page=1").is_none());
        assert!(cache.get("api_products_page=2").is_none());
        assert!(cache.get("api_categories_x").is_some());
        assert!(cache.get("api_settings").is_some());
    }

    #[test]
    fn test_clear() {
        let (mut cache, storage, _) = cache();
        cache.set("a", json!(1), SetOptions::default());
        cache.set("b", json!(2), SetOptions::default().memory_only());

        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.memory_entries, 0);
        assert_eq!(stats.durable_entries, 0);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_eviction_keeps_newest() {
        let storage = MemoryStorage::new();
        let (mut cache, clock) = cache_with(&storage, 4, VERSION);

        for i in 0..5 {
            cache.set(&format!("k{}", i), json!(i), SetOptions::default().memory_only());
            clock.advance(1);
        }

        let stats = cache.stats();
        assert!(stats.memory_entries <= 4);
        assert_eq!(stats.evictions, 1);
        assert!(!cache.in_memory("k0"));
        assert!(cache.in_memory("k4"));
    }

    #[test]
    fn test_sweep_durable() {
        let (mut cache, storage, clock) = cache();
        cache.set("short", json!(1), SetOptions::with_ttl_ms(10));
        cache.set("long", json!(2), SetOptions::with_ttl_ms(60_000));

        clock.advance(100);

        assert_eq!(cache.sweep_durable(), 1);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_stats_counts() {
        let (mut cache, _, _) = cache();
        cache.set("a", json!(1), SetOptions::default());
        cache.set("b", json!(1), SetOptions::default().memory_only());
        cache.get("a");
        cache.get("zzz");

        let stats = cache.stats();
        assert_eq!(stats.memory_entries, 2);
        assert_eq!(stats.durable_entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
