//! Three-Tiered Cache
//!
//! In-memory cache with Hot, Warm and Cold tiers, per-entry TTL, per-tier LRU
//! eviction and access-frequency driven promotion/demotion.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                          TieredCache (one lock)                           │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │  Hot Tier             │ Warm Tier            │ Cold Tier                 │
//! │  ┌────────────────┐   │ ┌────────────────┐   │ ┌────────────────────┐    │
//! │  │ TierStore      │   │ │ TierStore      │   │ │ TierStore          │    │
//! │  │ Capacity: 100  │   │ │ Capacity: 500  │   │ │ Capacity: 1000     │    │
//! │  └────────────────┘   │ └────────────────┘   │ └────────────────────┘    │
//! │         │             │         │            │           │               │
//! │         └─────────────┴─────────┴────────────┴───────────┘               │
//! │                              │                                           │
//! │                    Promotion/Demotion Controller                         │
//! │                    (LRU victims + access-count thresholds)               │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │  Maintenance task: expiry sweep + warm → hot promotion                   │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - A key lives in at most one tier at any time
//! - No tier ever holds more entries than its capacity
//! - Expired entries read as misses immediately and are removed by the
//!   next maintenance pass

mod entry;
mod maintenance;
mod manager;
mod metrics;
mod policy;
mod proptest;
mod tier;

pub use entry::CacheEntry;
pub use maintenance::{MaintenanceHandle, MaintenanceReport};
pub use manager::{CacheHit, TieredCache};
pub use metrics::{hit_rate, CacheStatistics};
pub use policy::TierPolicy;
pub use tier::{Tier, TierStore};
