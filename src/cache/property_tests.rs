//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check tier behavior over generated operation sequences.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::{DurableTier, MemoryStorage, SetOptions, TieredCache, DEFAULT_TTL_MS};
use crate::clock::ManualClock;

// == Test Configuration ==
const TEST_VERSION: &str = "1.0.0";
const TEST_START_MS: u64 = 1_700_000_000_000;

fn test_cache(capacity: usize) -> (TieredCache, MemoryStorage, Arc<ManualClock>) {
    let storage = MemoryStorage::new();
    let clock = Arc::new(ManualClock::new(TEST_START_MS));
    let durable = DurableTier::new(Box::new(storage.clone()), "sf_", TEST_VERSION);
    let cache = TieredCache::new(durable, capacity, DEFAULT_TTL_MS, clock.clone());
    (cache, storage, clock)
}

// == Strategies ==
/// Generates cache keys shaped like facade keys
fn key_strategy() -> impl Strategy<Value = String> {
    ("(products|categories|settings|search)", "[a-z0-9=&]{0,12}").prop_map(|(resource, params)| {
        if params.is_empty() {
            format!("api_{}", resource)
        } else {
            format!("api_{}_{}", resource, params)
        }
    })
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,32}".prop_map(Value::from),
        prop::collection::vec(any::<u16>(), 0..5).prop_map(|v| json!(v)),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value, memory_only: bool },
    Get { key: String },
    Invalidate { key: String },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy(), any::<bool>()).prop_map(|(key, value, memory_only)| {
            CacheOp::Set {
                key,
                value,
                memory_only,
            }
        }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Invalidate { key }),
        (0u64..120_000).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Statistics accuracy: for any sequence of operations, hits and misses
    // match what `get` reported.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let (mut cache, _, clock) = test_cache(50);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value, memory_only } => {
                    let options = if memory_only {
                        SetOptions::default().memory_only()
                    } else {
                        SetOptions::default()
                    };
                    cache.set(&key, value, options);
                }
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Invalidate { key } => cache.invalidate(&key),
                CacheOp::Advance { ms } => clock.advance(ms),
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
    }

    // Last write wins: a key read back before expiry returns the most recent value.
    #[test]
    fn prop_last_write_wins(
        key in key_strategy(),
        first in value_strategy(),
        second in value_strategy(),
        second_memory_only in any::<bool>()
    ) {
        let (mut cache, _, _) = test_cache(50);

        cache.set(&key, first, SetOptions::default());
        let options = if second_memory_only {
            SetOptions::default().memory_only()
        } else {
            SetOptions::default()
        };
        cache.set(&key, second.clone(), options);

        prop_assert_eq!(cache.get(&key), Some(second));
    }

    // TTL expiry: an entry set with ttl T is present at T and absent after T.
    #[test]
    fn prop_ttl_boundary(
        key in key_strategy(),
        value in value_strategy(),
        ttl_ms in 1u64..10_000_000
    ) {
        let (mut cache, _, clock) = test_cache(50);
        cache.set(&key, value.clone(), SetOptions::with_ttl_ms(ttl_ms));

        clock.advance(ttl_ms - 1);
        prop_assert_eq!(cache.get(&key), Some(value));

        clock.advance(2);
        prop_assert_eq!(cache.get(&key), None);
    }

    // Capacity enforcement: the volatile tier never exceeds its cap and the
    // newest entry always survives eviction.
    #[test]
    fn prop_capacity_enforcement(
        keys in prop::collection::vec(key_strategy(), 1..200),
        capacity in 1usize..40
    ) {
        let (mut cache, _, clock) = test_cache(capacity);

        for key in keys {
            clock.advance(1);
            cache.set(&key, json!(1), SetOptions::default().memory_only());
            prop_assert!(
                cache.stats().memory_entries <= capacity,
                "Memory tier size {} exceeds cap {}",
                cache.stats().memory_entries,
                capacity
            );
            prop_assert!(cache.in_memory(&key), "Newest key '{}' was evicted", key);
        }
    }

    // Pattern invalidation removes exactly the keys containing the pattern.
    #[test]
    fn prop_pattern_invalidation_exact(
        keys in prop::collection::vec(key_strategy(), 1..30),
        pattern in "(products|categories|settings|search|=)"
    ) {
        let (mut cache, _, _) = test_cache(100);
        let unique: HashSet<String> = keys.into_iter().collect();
        for key in &unique {
            cache.set(key, json!(key), SetOptions::default());
        }

        cache.invalidate_pattern(&pattern);

        for key in &unique {
            let present = cache.get(key).is_some();
            prop_assert_eq!(present, !key.contains(pattern.as_str()), "Key '{}'", key);
        }
    }

    // Memory-only entries never reach durable storage.
    #[test]
    fn prop_memory_only_never_persisted(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..30)
    ) {
        let (mut cache, storage, _) = test_cache(100);

        for (key, value) in entries {
            cache.set(&key, value, SetOptions::default().memory_only());
        }

        prop_assert!(storage.is_empty());
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_fill_to_cap_plus_one() {
        let capacity = 20;
        let (mut cache, _, clock) = test_cache(capacity);

        for i in 0..=capacity {
            clock.advance(1);
            cache.set(&format!("api_products_page={}", i), json!(i), SetOptions::default().memory_only());
        }

        let stats = cache.stats();
        assert!(stats.memory_entries <= capacity);
        assert_eq!(stats.evictions, 5);
        assert!(cache.in_memory(&format!("api_products_page={}", capacity)));
        for i in 0..5 {
            assert!(!cache.in_memory(&format!("api_products_page={}", i)));
        }
    }
}
