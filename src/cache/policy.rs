//! Tier Transition Policy
//!
//! Access-count thresholds that decide whether an evicted entry is demoted
//! or dropped, and which warm entries maintenance may lift into the hot tier.
//! All thresholds are strict: an entry qualifies when its access count is
//! *greater than* the threshold.

use serde::{Deserialize, Serialize};

use super::tier::Tier;

/// Promotion/demotion thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPolicy {
    /// Hot victims with more accesses than this are demoted to Warm
    pub hot_demotion_min_accesses: u64,
    /// Warm victims with more accesses than this are demoted to Cold
    pub warm_demotion_min_accesses: u64,
    /// Warm entries with more accesses than this are promoted by maintenance
    pub maintenance_promotion_min_accesses: u64,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            hot_demotion_min_accesses: 1,
            warm_demotion_min_accesses: 2,
            maintenance_promotion_min_accesses: 10,
        }
    }
}

impl TierPolicy {
    /// Whether a victim evicted from `tier` earns a slot one tier down
    ///
    /// Cold victims are always dropped.
    pub fn should_demote(&self, tier: Tier, access_count: u64) -> bool {
        match tier {
            Tier::Hot => access_count > self.hot_demotion_min_accesses,
            Tier::Warm => access_count > self.warm_demotion_min_accesses,
            Tier::Cold => false,
        }
    }

    /// Whether maintenance should move a warm entry into spare hot capacity
    pub fn should_promote_on_maintenance(&self, access_count: u64) -> bool {
        access_count > self.maintenance_promotion_min_accesses
    }
}

// =============================================================================
// Tests
// =============================================================================
