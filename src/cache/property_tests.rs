//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache and throttle invariants against a
//! simulated clock.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::{Clock, ManualClock, QueryCache, RequestThrottle};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_DEFAULT_TTL: u64 = 120_000;

// == Strategies ==
/// Generates cache keys shaped like gallery query keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_:=]{1,32}".prop_map(|s| s)
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

/// A cache operation interleaved with clock movement
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String, ttl: u64 },
    Get { key: String },
    Remove { key: String },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy(), 1u64..5_000)
            .prop_map(|(key, value, ttl)| CacheOp::Set { key, value, ttl }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Remove { key }),
        (0u64..3_000).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

fn cache_with_clock(max_entries: usize) -> (QueryCache<String>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    (
        QueryCache::with_clock(max_entries, TEST_DEFAULT_TTL, clock.clone()),
        clock,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Set then immediate get returns the value; once the TTL has elapsed the
    // get returns nothing and the entry is gone.
    #[test]
    fn prop_set_get_then_expire(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl in 1u64..1_000_000
    ) {
        let (mut cache, clock) = cache_with_clock(TEST_MAX_ENTRIES);

        cache.set(key.clone(), value.clone(), Some(ttl));
        prop_assert_eq!(cache.get(&key), Some(value));

        clock.advance(ttl + 1);
        prop_assert_eq!(cache.get(&key), None);
        prop_assert!(!cache.contains_key(&key), "expired entry should be removed on read");
    }

    // No interleaving of operations lets a get return a stale value.
    #[test]
    fn prop_get_never_returns_stale(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let (mut cache, clock) = cache_with_clock(TEST_MAX_ENTRIES);
        // key -> (value, stored_at, ttl) for the latest set
        let mut model: std::collections::HashMap<String, (String, u64, u64)> =
            std::collections::HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value, ttl } => {
                    model.insert(key.clone(), (value.clone(), clock.now_ms(), ttl));
                    cache.set(key, value, Some(ttl));
                }
                CacheOp::Get { key } => {
                    if let Some(got) = cache.get(&key) {
                        let (expected, stored_at, ttl) = model
                            .get(&key)
                            .cloned()
                            .expect("cache returned a key that was never set");
                        prop_assert_eq!(got, expected);
                        prop_assert!(clock.now_ms() - stored_at <= ttl, "stale value returned");
                    }
                }
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                    model.remove(&key);
                }
                CacheOp::Advance { ms } => clock.advance(ms),
            }
        }
    }

    // Overwriting a key leaves exactly one entry holding the newest value.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let (mut cache, _) = cache_with_clock(TEST_MAX_ENTRIES);

        cache.set(key.clone(), value1, None);
        cache.set(key.clone(), value2.clone(), None);

        prop_assert_eq!(cache.get(&key), Some(value2));
        prop_assert_eq!(cache.len(), 1);
    }

    // Size never exceeds max_entries for any sequence of operations.
    #[test]
    fn prop_capacity_enforcement(ops in prop::collection::vec(cache_op_strategy(), 1..300)) {
        let max_entries = 20;
        let (mut cache, clock) = cache_with_clock(max_entries);

        for op in ops {
            match op {
                CacheOp::Set { key, value, ttl } => cache.set(key, value, Some(ttl)),
                CacheOp::Get { key } => { cache.get(&key); }
                CacheOp::Remove { key } => { cache.remove(&key); }
                CacheOp::Advance { ms } => clock.advance(ms),
            }
            prop_assert!(
                cache.len() <= max_entries,
                "Cache size {} exceeds max {}",
                cache.len(),
                max_entries
            );
        }
    }

    // With no expired entries, inserting one key past capacity drops the
    // oldest inserted key and nothing else.
    #[test]
    fn prop_fifo_eviction_order(
        initial_keys in prop::collection::vec(valid_key_strategy(), 3..12),
        new_key in valid_key_strategy(),
        new_value in valid_value_strategy()
    ) {
        let unique_keys: Vec<String> = {
            let mut seen = HashSet::new();
            initial_keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
        };
        prop_assume!(unique_keys.len() >= 2);
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let (mut cache, _) = cache_with_clock(capacity);

        for key in &unique_keys {
            cache.set(key.clone(), format!("value_{}", key), None);
        }
        // Reading the oldest key does not protect it
        let _ = cache.get(&unique_keys[0]);

        cache.set(new_key.clone(), new_value, None);

        prop_assert_eq!(cache.len(), capacity);
        prop_assert!(cache.get(&unique_keys[0]).is_none(), "oldest key should be evicted");
        prop_assert!(cache.get(&new_key).is_some());
        for key in unique_keys.iter().skip(1) {
            prop_assert!(cache.get(key).is_some(), "Key '{}' should survive", key);
        }
        prop_assert_eq!(cache.stats().evictions, 1);
    }

    // The throttle lets the first call through, blocks repeats inside the
    // window, and opens again once the window has passed since the last
    // accepted call.
    #[test]
    fn prop_fixed_window_throttle(
        key in valid_key_strategy(),
        interval in 1u64..10_000,
        offsets in prop::collection::vec(0u64..20_000, 1..30)
    ) {
        let clock = Arc::new(ManualClock::new(0));
        let mut throttle = RequestThrottle::with_clock(clock.clone());

        prop_assert!(!throttle.should_throttle(&key, interval));
        let mut last_accepted = clock.now_ms();

        for step in offsets {
            clock.advance(step);
            let throttled = throttle.should_throttle(&key, interval);
            let expected = clock.now_ms() - last_accepted < interval;
            prop_assert_eq!(throttled, expected);
            if !throttled {
                last_accepted = clock.now_ms();
            }
        }
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserting_past_capacity_evicts_at_least_one() {
        let (mut cache, _) = cache_with_clock(TEST_MAX_ENTRIES);

        for i in 0..TEST_MAX_ENTRIES {
            cache.set(format!("key{}", i), "v".to_string(), None);
        }
        assert_eq!(cache.len(), TEST_MAX_ENTRIES);

        cache.set("key100", "v".to_string(), None);

        assert_eq!(cache.len(), TEST_MAX_ENTRIES);
        assert!(cache.get("key0").is_none());
        assert!(cache.get("key100").is_some());
    }
}
