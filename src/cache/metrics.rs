//! Cache Statistics
//!
//! Counters live inside the cache's locked state, so a snapshot is always
//! consistent with the tier contents it was taken alongside.

use serde::Serialize;

use super::tier::Tier;

/// Monotonic operation counters owned by one cache instance
#[derive(Debug, Default, Clone)]
pub(crate) struct CacheCounters {
    hits: u64,
    misses: u64,
    evictions: u64,
    promotions: u64,
    demotions: u64,
    expirations: u64,
}

impl CacheCounters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_promotion(&mut self) {
        self.promotions += 1;
    }

    pub fn record_demotion(&mut self) {
        self.demotions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Build a snapshot given the current per-tier entry counts
    pub fn snapshot(&self, hot: usize, warm: usize, cold: usize) -> CacheStatistics {
        CacheStatistics {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            promotions: self.promotions,
            demotions: self.demotions,
            expirations: self.expirations,
            hit_rate: hit_rate(self.hits, self.misses),
            hot_entries: hot,
            warm_entries: warm,
            cold_entries: cold,
            total_entries: hot + warm + cold,
        }
    }
}

/// `hits / (hits + misses)`, or 0 before any lookup
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Point-in-time copy of the cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    /// Capacity-driven removals from any tier, demoted or dropped
    pub evictions: u64,
    pub promotions: u64,
    pub demotions: u64,
    /// Entries removed by maintenance sweeps
    pub expirations: u64,
    pub hit_rate: f64,
    pub hot_entries: usize,
    pub warm_entries: usize,
    pub cold_entries: usize,
    pub total_entries: usize,
}

impl CacheStatistics {
    /// Total number of `get` calls observed
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Entry count for a single tier
    pub fn entries_in(&self, tier: Tier) -> usize {
        match tier {
            Tier::Hot => self.hot_entries,
            Tier::Warm => self.warm_entries,
            Tier::Cold => self.cold_entries,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
