//! Volatile Tier Module
//!
//! Process-local entry map with a hard entry cap and approximate LRU eviction.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Eviction Fraction ==
/// Share of the tier dropped when it is still full after removing expired entries.
const EVICTION_DIVISOR: usize = 4;

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    /// Insertion sequence, breaks `created_at` ties
    seq: u64,
}

// == Memory Tier ==
/// Bounded in-memory storage for cache entries.
///
/// When an insert of a new key finds the tier full, expired entries are
/// dropped first; if the tier is still full, the oldest quarter by
/// `created_at` goes.
#[derive(Debug)]
pub struct MemoryTier {
    slots: HashMap<String, Slot>,
    capacity: usize,
    next_seq: u64,
}

/// What an insert had to remove to make room.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Expired entries dropped
    pub expired: usize,
    /// Live entries dropped because the tier was full
    pub evicted: usize,
}

impl MemoryTier {
    // == Constructor ==
    /// Creates an empty tier holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    /// Returns the entry stored under `key`, expired or not.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.slots.get(key).map(|slot| &slot.entry)
    }

    // == Insert ==
    /// Stores an entry, overwriting any prior entry under the same key.
    pub fn insert(&mut self, entry: CacheEntry, now_ms: u64) -> InsertOutcome {
        let mut outcome = InsertOutcome::default();

        if !self.slots.contains_key(&entry.key) && self.slots.len() >= self.capacity {
            outcome.expired = self.purge_expired(now_ms);
            if self.slots.len() >= self.capacity {
                outcome.evicted = self.evict_oldest_quarter();
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(entry.key.clone(), Slot { entry, seq });
        outcome
    }

    /// Drops the oldest `ceil(len / 4)` entries, at least one.
    fn evict_oldest_quarter(&mut self) -> usize {
        let count = self.slots.len().div_ceil(EVICTION_DIVISOR).max(1);

        let mut by_age: Vec<(u64, u64, String)> = self
            .slots
            .iter()
            .map(|(key, slot)| (slot.entry.created_at, slot.seq, key.clone()))
            .collect();
        by_age.sort_unstable();

        for (_, _, key) in by_age.into_iter().take(count) {
            self.slots.remove(&key);
        }
        count
    }

    // == Remove ==
    /// Removes a key. Returns true if it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Removes every key containing `pattern`. Returns the number removed.
    pub fn remove_matching(&mut self, pattern: &str) -> usize {
        let before = self.slots.len();
        self.slots.retain(|key, _| !key.contains(pattern));
        before - self.slots.len()
    }

    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&mut self, now_ms: u64) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.entry.is_expired_at(now_ms));
        before - self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str, ttl_ms: u64, now_ms: u64) -> CacheEntry {
        CacheEntry::new(key, json!(key), ttl_ms, now_ms, "v1")
    }

    #[test]
    fn test_insert_and_get() {
        let mut tier = MemoryTier::new(10);
        tier.insert(entry("a", 1_000, 0), 0);

        assert_eq!(tier.get("a").map(|e| e.value.clone()), Some(json!("a")));
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let mut tier = MemoryTier::new(2);
        tier.insert(entry("a", 1_000, 0), 0);
        tier.insert(entry("b", 1_000, 1), 1);

        let outcome = tier.insert(entry("a", 1_000, 2), 2);

        assert_eq!(outcome, InsertOutcome::default());
        assert_eq!(tier.len(), 2);
        assert!(tier.contains("b"));
    }

    #[test]
    fn test_full_tier_drops_expired_first() {
        let mut tier = MemoryTier::new(4);
        tier.insert(entry("short", 10, 0), 0);
        tier.insert(entry("b", 10_000, 1), 1);
        tier.insert(entry("c", 10_000, 2), 2);
        tier.insert(entry("d", 10_000, 3), 3);

        let outcome = tier.insert(entry("e", 10_000, 100), 100);

        assert_eq!(outcome.expired, 1);
        assert_eq!(outcome.evicted, 0);
        assert!(!tier.contains("short"));
        assert!(tier.contains("b"));
        assert_eq!(tier.len(), 4);
    }

    #[test]
    fn test_full_tier_evicts_oldest_quarter() {
        let mut tier = MemoryTier::new(8);
        for i in 0..8 {
            tier.insert(entry(&format!("k{}", i), 10_000, i), i);
        }

        let outcome = tier.insert(entry("new", 10_000, 50), 50);

        assert_eq!(outcome.evicted, 2);
        assert!(!tier.contains("k0"));
        assert!(!tier.contains("k1"));
        assert!(tier.contains("k2"));
        assert!(tier.contains("new"));
        assert_eq!(tier.len(), 7);
    }

    #[test]
    fn test_same_timestamp_evicts_by_insertion_order() {
        let mut tier = MemoryTier::new(4);
        for key in ["a", "b", "c", "d"] {
            tier.insert(entry(key, 10_000, 5), 5);
        }

        tier.insert(entry("e", 10_000, 5), 5);

        assert!(!tier.contains("a"));
        assert!(tier.contains("b"));
        assert!(tier.contains("e"));
    }

    #[test]
    fn test_remove_matching() {
        let mut tier = MemoryTier::new(10);
        tier.insert(entry("api_products_page=1", 1_000, 0), 0);
        tier.insert(entry("api_products_page=2", 1_000, 0), 0);
        tier.insert(entry("api_settings", 1_000, 0), 0);

        assert_eq!(tier.remove_matching("products"), 2);
        assert_eq!(tier.len(), 1);
        assert!(tier.contains("api_settings"));
    }

    #[test]
    fn test_remove_missing_key() {
        let mut tier = MemoryTier::new(10);
        assert!(!tier.remove("missing"));
    }

    #[test]
    fn test_zero_capacity_holds_one_entry() {
        let mut tier = MemoryTier::new(0);
        tier.insert(entry("a", 1_000, 0), 0);
        tier.insert(entry("b", 1_000, 1), 1);

        assert_eq!(tier.capacity(), 1);
        assert_eq!(tier.len(), 1);
        assert!(tier.contains("b"));
    }
}
