//! tiercache - Three-Tier In-Memory Cache
//!
//! A bounded Hot/Warm/Cold cache with per-entry TTL, per-tier LRU eviction,
//! access-frequency driven promotion and demotion, and a background
//! maintenance task.
//!
//! # Architecture
//!
//! ```text
//! get ──▶ Hot ──miss──▶ Warm ──miss──▶ Cold ──miss──▶ None
//!                         │ hit           │ hit
//!                         ▼               ▼
//!                   promote to Hot   promote to Warm
//!
//! set ──▶ Hot (evict LRU ──▶ Warm ──▶ Cold ──▶ dropped, gated by access count)
//! ```
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tiercache::{TierCapacities, TieredCache};
//!
//! let cache = TieredCache::new(TierCapacities::new(100, 500, 1000), Duration::from_secs(60))?;
//! cache.set("answer", 42u64, None);
//! assert_eq!(cache.get("answer"), Some(42));
//! assert_eq!(cache.stats().hit_rate, 1.0);
//! # Ok::<(), tiercache::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Tier stores, promotion/demotion controller, maintenance
//! - [`config`] - Capacities, TTLs and YAML loading
//! - [`error`] - Error types
//! - [`monitoring`] - Prometheus collector

pub mod cache;
pub mod config;
pub mod error;
pub mod monitoring;

// Re-export commonly used types
pub use cache::{
    CacheEntry, CacheHit, CacheStatistics, MaintenanceHandle, MaintenanceReport, Tier, TierPolicy,
    TieredCache,
};
pub use config::{CacheConfig, TierCapacities};
pub use error::{Error, Result};
pub use monitoring::CacheCollector;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
