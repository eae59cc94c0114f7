//! Cache Entry Types
//!
//! One cached value plus the access metadata that drives expiry, LRU victim
//! selection and tier movement.

use std::time::{Duration, Instant};

/// Cached value with its metadata
///
/// The value, insertion time and TTL are fixed for the entry's lifetime and
/// travel with it across tiers; only the access metadata changes.
#[derive(Clone)]
pub struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
    /// Starts at 1 on insert, +1 on every hit
    access_count: u64,
    last_accessed_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Create a new entry inserted now
    pub fn new(value: V, ttl: Duration) -> Self {
        Self::new_at(value, ttl, Instant::now())
    }

    /// Create a new entry inserted at `now`
    pub fn new_at(value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
            ttl,
            access_count: 1,
            last_accessed_at: now,
        }
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }

    #[inline]
    pub fn inserted_at(&self) -> Instant {
        self.inserted_at
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    #[inline]
    pub fn last_accessed_at(&self) -> Instant {
        self.last_accessed_at
    }

    /// Instant at which the entry expires, `None` if it never can
    #[inline]
    pub fn expires_at(&self) -> Option<Instant> {
        self.inserted_at.checked_add(self.ttl)
    }

    /// Expired iff `now >= inserted_at + ttl`
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at() {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Record a hit at `now` and return the new access count
    ///
    /// `last_accessed_at` never moves backwards, so it stays `>= inserted_at`.
    pub fn record_access_at(&mut self, now: Instant) -> u64 {
        self.last_accessed_at = self.last_accessed_at.max(now);
        self.access_count = self.access_count.saturating_add(1);
        self.access_count
    }
}

impl<V> std::fmt::Debug for CacheEntry<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("ttl", &self.ttl)
            .field("access_count", &self.access_count)
            .field("age", &self.last_accessed_at.duration_since(self.inserted_at))
            .field("is_expired", &self.is_expired())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
