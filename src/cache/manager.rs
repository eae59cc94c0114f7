//! Tiered Cache - Lookup, Insert and Tier Transitions
//!
//! Orchestrates the Hot, Warm and Cold tier stores behind a single lock.
//!
//! # Tier transitions
//!
//! ```text
//!            set ──▶ ┌─────┐  evict, accesses > 1   ┌──────┐  evict, accesses > 2   ┌──────┐
//!                    │ Hot │ ─────────────────────▶ │ Warm │ ─────────────────────▶ │ Cold │ ──▶ dropped
//!                    └─────┘ ◀───────────────────── └──────┘ ◀───────────────────── └──────┘
//!                               hit (or maintenance)              hit
//! ```
//!
//! Every transition removes the entry from its old tier before inserting it
//! into the new one, so a key lives in at most one tier. Victims are taken
//! from the tier by value, which is what gets demoted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::entry::CacheEntry;
use super::maintenance::{self, MaintenanceHandle, MaintenanceReport};
use super::metrics::{CacheCounters, CacheStatistics};
use super::policy::TierPolicy;
use super::tier::{Tier, TierStore};
use crate::config::{CacheConfig, TierCapacities};
use crate::error::{Error, Result};

/// Result of a lookup that reports where the value was found
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<V> {
    pub value: V,
    /// Tier that served the hit, before any promotion
    pub tier: Tier,
}

/// All mutable cache state, guarded as one unit
struct TierState<V> {
    hot: TierStore<V>,
    warm: TierStore<V>,
    cold: TierStore<V>,
    counters: CacheCounters,
    policy: TierPolicy,
}

impl<V> TierState<V> {
    fn new(config: &CacheConfig) -> Self {
        let capacities = &config.capacities;
        Self {
            hot: TierStore::new(Tier::Hot, capacities.hot),
            warm: TierStore::new(Tier::Warm, capacities.warm),
            cold: TierStore::new(Tier::Cold, capacities.cold),
            counters: CacheCounters::default(),
            policy: config.policy.clone(),
        }
    }

    fn store(&self, tier: Tier) -> &TierStore<V> {
        match tier {
            Tier::Hot => &self.hot,
            Tier::Warm => &self.warm,
            Tier::Cold => &self.cold,
        }
    }

    fn store_mut(&mut self, tier: Tier) -> &mut TierStore<V> {
        match tier {
            Tier::Hot => &mut self.hot,
            Tier::Warm => &mut self.warm,
            Tier::Cold => &mut self.cold,
        }
    }

    fn locate(&self, key: &str) -> Option<Tier> {
        Tier::ALL.into_iter().find(|tier| self.store(*tier).contains(key))
    }

    /// Evict one victim from `tier` if it has no room for a new key
    fn make_room(&mut self, tier: Tier, now: Instant) {
        if self.store(tier).is_full() {
            self.evict(tier, now);
        }
    }

    /// Evict the LRU victim of `tier`, demoting it one tier down if its
    /// access count clears the policy threshold
    fn evict(&mut self, tier: Tier, now: Instant) {
        let Some((key, victim)) = self.store_mut(tier).pop_lru() else {
            return;
        };
        self.counters.record_eviction();

        let target = tier.colder().filter(|_| {
            self.policy.should_demote(tier, victim.access_count()) && !victim.is_expired_at(now)
        });

        match target {
            Some(target) => {
                debug!(
                    key = %key,
                    from = %tier,
                    to = %target,
                    access_count = victim.access_count(),
                    "Demoting evicted entry"
                );
                // The victim is out of `tier` already, so a cascade from
                // `target` can never come back into it.
                self.make_room(target, now);
                self.store_mut(target).put(key, victim);
                self.counters.record_demotion();
            }
            None => {
                debug!(
                    key = %key,
                    tier = %tier,
                    access_count = victim.access_count(),
                    "Dropping evicted entry"
                );
            }
        }
    }

    /// Move a fresh entry one tier up after a hit, returning its value
    fn promote(&mut self, key: &str, from: Tier, now: Instant) -> Option<V>
    where
        V: Clone,
    {
        let target = from.hotter()?;
        let mut entry = self.store_mut(from).remove(key)?;
        entry.record_access_at(now);
        let value = entry.value().clone();

        self.make_room(target, now);
        self.store_mut(target).put(key.to_string(), entry);
        self.counters.record_promotion();

        debug!(key = %key, from = %from, to = %target, "Promoted entry");
        Some(value)
    }

    fn lookup(&mut self, key: &str, now: Instant) -> Option<CacheHit<V>>
    where
        V: Clone,
    {
        for tier in Tier::ALL {
            let Some(entry) = self.store(tier).peek(key) else {
                continue;
            };

            if entry.is_expired_at(now) {
                // Lazy expiry: leave it for the sweep. Single residency means
                // no other tier can hold this key.
                trace!(key = %key, tier = %tier, "Expired entry treated as miss");
                break;
            }

            let value = match tier {
                Tier::Hot => self.hot.touch(key, now).map(|e| e.value().clone()),
                Tier::Warm | Tier::Cold => self.promote(key, tier, now),
            };

            if let Some(value) = value {
                self.counters.record_hit();
                trace!(key = %key, tier = %tier, "Cache hit");
                return Some(CacheHit { value, tier });
            }
        }

        self.counters.record_miss();
        trace!(key = %key, "Cache miss");
        None
    }

    fn insert(&mut self, key: String, entry: CacheEntry<V>, now: Instant) {
        self.warm.remove(&key);
        self.cold.remove(&key);

        if !self.hot.contains(&key) {
            self.make_room(Tier::Hot, now);
        }
        self.hot.put(key, entry);
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let tier = self.locate(key)?;
        self.store_mut(tier).remove(key)
    }

    fn maintain(&mut self, now: Instant) -> MaintenanceReport {
        let expired: usize = Tier::ALL
            .into_iter()
            .map(|tier| self.store_mut(tier).sweep_expired(now))
            .sum();
        self.counters.record_expirations(expired);

        let mut promoted = 0;
        if !self.hot.is_full() {
            let policy = &self.policy;
            let mut candidates: Vec<(String, u64)> = self
                .warm
                .keys_where(|e| policy.should_promote_on_maintenance(e.access_count()))
                .into_iter()
                .filter_map(|key| {
                    let count = self.warm.peek(&key)?.access_count();
                    Some((key, count))
                })
                .collect();
            // Most accessed first; the sort is stable so recency breaks ties
            candidates.sort_by(|a, b| b.1.cmp(&a.1));

            for (key, _) in candidates {
                if self.hot.is_full() {
                    break;
                }
                if let Some(entry) = self.warm.remove(&key) {
                    self.hot.put(key, entry);
                    self.counters.record_promotion();
                    promoted += 1;
                }
            }
        }

        MaintenanceReport { expired, promoted }
    }

    fn len(&self) -> usize {
        self.hot.len() + self.warm.len() + self.cold.len()
    }

    fn statistics(&self) -> CacheStatistics {
        self.counters
            .snapshot(self.hot.len(), self.warm.len(), self.cold.len())
    }

    fn clear(&mut self) {
        self.hot.clear();
        self.warm.clear();
        self.cold.clear();
        self.counters.reset();
    }
}

/// Three-tier in-memory cache
///
/// Every operation, including a plain hot-tier hit, takes one exclusive
/// lock over all tiers and counters, so tier transitions are atomic with
/// respect to other callers and the maintenance task.
pub struct TieredCache<V> {
    state: Mutex<TierState<V>>,
    config: CacheConfig,
}

impl<V> TieredCache<V> {
    /// Create a cache with the given capacities and default TTL
    pub fn new(capacities: TierCapacities, default_ttl: Duration) -> Result<Self> {
        Self::with_config(CacheConfig::new(capacities, default_ttl))
    }

    /// Create a cache from a full configuration
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(TierState::new(&config)),
            config,
        })
    }

    /// Insert `value` into the hot tier, replacing any copy of `key` in
    /// any tier. `None` uses the configured default TTL.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let now = Instant::now();
        let entry = CacheEntry::new_at(value, ttl.unwrap_or(self.config.default_ttl), now);

        self.state.lock().insert(key, entry, now);
    }

    /// Remove `key` from whichever tier holds it
    pub fn remove(&self, key: &str) -> Option<V> {
        self.state.lock().remove(key).map(CacheEntry::into_value)
    }

    /// Whether any tier holds `key`, expired or not. Does not count as an access.
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().locate(key).is_some()
    }

    /// Tier currently holding `key`. Does not count as an access.
    pub fn tier_of(&self, key: &str) -> Option<Tier> {
        self.state.lock().locate(key)
    }

    /// Number of stored entries across all tiers, including expired ones
    /// not yet swept
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty every tier and reset all counters
    pub fn clear(&self) {
        self.state.lock().clear();
        debug!("Cache cleared");
    }

    /// Snapshot of the statistics
    pub fn stats(&self) -> CacheStatistics {
        self.state.lock().statistics()
    }

    /// Run one expiry sweep and opportunistic promotion pass now
    pub fn run_maintenance(&self) -> MaintenanceReport {
        self.state.lock().maintain(Instant::now())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl<V: Clone> TieredCache<V> {
    /// Look up `key`, promoting it one tier on a warm or cold hit
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_with_tier(key).map(|hit| hit.value)
    }

    /// Like [`get`](Self::get), also reporting which tier served the hit
    pub fn get_with_tier(&self, key: &str) -> Option<CacheHit<V>> {
        self.state.lock().lookup(key, Instant::now())
    }

    /// Return the cached value or compute, store and return a new one
    ///
    /// `compute` runs without the lock held; concurrent misses on the same
    /// key may each compute, and the last write wins.
    pub fn get_or_insert_with<F>(&self, key: &str, ttl: Option<Duration>, compute: F) -> V
    where
        F: FnOnce(&str) -> V,
    {
        if let Some(value) = self.get(key) {
            return value;
        }

        let value = compute(key);
        self.set(key, value.clone(), ttl);
        value
    }
}

impl<V: Send + 'static> TieredCache<V> {
    /// Start periodic maintenance on the current tokio runtime
    ///
    /// The task holds only a weak reference, so it also ends once the cache
    /// is dropped.
    pub fn start_maintenance(self: &Arc<Self>, interval: Duration) -> Result<MaintenanceHandle> {
        if interval.is_zero() {
            return Err(Error::InvalidConfiguration(
                "maintenance interval must be greater than zero".to_string(),
            ));
        }
        maintenance::spawn(Arc::downgrade(self), interval)
    }
}

impl<V> std::fmt::Debug for TieredCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TieredCache")
            .field("hot", &state.hot)
            .field("warm", &state.warm)
            .field("cold", &state.cold)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
