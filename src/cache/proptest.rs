//! Property-Based Tests for the Tiered Cache
//!
//! Drives the cache with arbitrary operation sequences and checks the
//! structural invariants after every step.
//!
//! # Test Properties
//!
//! 1. **Single residency**: no key is ever stored in two tiers
//! 2. **Capacity bound**: no tier exceeds its capacity
//! 3. **Hit rate**: `hit_rate == hits / lookups` for any lookup mix
//! 4. **Read-your-write**: a fresh `set` is always visible to the next `get`

#![cfg(test)]

use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;

use super::manager::TieredCache;
use super::tier::Tier;
use crate::config::TierCapacities;

// =============================================================================
// Property Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Set(u8, i32),
    Get(u8),
    Remove(u8),
    Maintain,
}

/// Small key space so operations collide and tiers overflow
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..24, any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
        6 => (0u8..24).prop_map(Op::Get),
        1 => (0u8..24).prop_map(Op::Remove),
        1 => Just(Op::Maintain),
    ]
}

fn capacities_strategy() -> impl Strategy<Value = (usize, usize, usize)> {
    (1usize..=4, 1usize..=6, 1usize..=8)
}

fn key(k: u8) -> String {
    format!("key-{}", k)
}

fn apply(cache: &TieredCache<i32>, op: &Op) {
    match op {
        Op::Set(k, v) => cache.set(key(*k), *v, None),
        Op::Get(k) => {
            cache.get(&key(*k));
        }
        Op::Remove(k) => {
            cache.remove(&key(*k));
        }
        Op::Maintain => {
            cache.run_maintenance();
        }
    }
}

// =============================================================================
// Invariant Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_single_residency_and_capacity(
        (hot, warm, cold) in capacities_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..200),
    ) {
        let capacities = TierCapacities::new(hot, warm, cold);
        let cache = TieredCache::new(capacities, Duration::from_secs(3600)).unwrap();

        for op in &ops {
            apply(&cache, op);

            let stats = cache.stats();
            prop_assert!(stats.hot_entries <= hot);
            prop_assert!(stats.warm_entries <= warm);
            prop_assert!(stats.cold_entries <= cold);

            // len() counts per-tier membership; a key in two tiers would
            // make it exceed the number of distinct resident keys
            let resident: HashSet<u8> = (0u8..24).filter(|k| cache.contains(&key(*k))).collect();
            prop_assert_eq!(resident.len(), cache.len());
            prop_assert_eq!(stats.total_entries, cache.len());
        }
    }

    #[test]
    fn prop_set_then_get_hits_hot(
        (hot, warm, cold) in capacities_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..100),
        k in 0u8..24,
        v in any::<i32>(),
    ) {
        let cache = TieredCache::new(
            TierCapacities::new(hot, warm, cold),
            Duration::from_secs(3600),
        ).unwrap();

        for op in &ops {
            apply(&cache, op);
        }

        cache.set(key(k), v, None);
        let hit = cache.get_with_tier(&key(k));
        prop_assert_eq!(hit.map(|h| (h.value, h.tier)), Some((v, Tier::Hot)));
    }

    #[test]
    fn prop_hit_rate_matches_counts(
        present in prop::collection::vec(any::<bool>(), 0..64),
    ) {
        let cache = TieredCache::new(TierCapacities::new(64, 64, 64), Duration::from_secs(3600)).unwrap();
        cache.set("present", 1, None);

        let mut hits = 0u64;
        for &is_hit in &present {
            if is_hit {
                prop_assert!(cache.get("present").is_some());
                hits += 1;
            } else {
                prop_assert!(cache.get("absent").is_none());
            }
        }

        let stats = cache.stats();
        let n = present.len() as u64;
        prop_assert_eq!(stats.hits, hits);
        prop_assert_eq!(stats.misses, n - hits);
        if n == 0 {
            prop_assert_eq!(stats.hit_rate, 0.0);
        } else {
            prop_assert!((stats.hit_rate - hits as f64 / n as f64).abs() < 1e-12);
        }
    }
}
