//! Tier Store - Bounded LRU Storage
//!
//! A single cache tier: a key → entry map with a fixed entry capacity and an
//! ordered recency index for least-recently-used victim selection.
//!
//! # Design
//!
//! - `HashMap` for O(1) lookup
//! - `BTreeMap<(last_accessed_at, seq), key>` recency index; the first key is
//!   always the LRU victim, ties going to the earliest write or touch
//! - The store never evicts on its own: callers make room first so the
//!   victim can be demoted by the controller

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use serde::Serialize;

use super::entry::CacheEntry;

/// Cache tier, hottest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Most frequently accessed entries
    Hot,
    /// Entries demoted from Hot or promoted from Cold
    Warm,
    /// Entries demoted from Warm
    Cold,
}

impl Tier {
    /// All tiers in probe order
    pub const ALL: [Tier; 3] = [Tier::Hot, Tier::Warm, Tier::Cold];

    /// Next tier down, where demoted entries land
    pub fn colder(self) -> Option<Tier> {
        match self {
            Tier::Hot => Some(Tier::Warm),
            Tier::Warm => Some(Tier::Cold),
            Tier::Cold => None,
        }
    }

    /// Next tier up, where promoted entries land
    pub fn hotter(self) -> Option<Tier> {
        match self {
            Tier::Hot => None,
            Tier::Warm => Some(Tier::Hot),
            Tier::Cold => Some(Tier::Warm),
        }
    }

    /// Lowercase label used in metrics
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Warm => "warm",
            Tier::Cold => "cold",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Hot => write!(f, "Hot"),
            Tier::Warm => write!(f, "Warm"),
            Tier::Cold => write!(f, "Cold"),
        }
    }
}

/// Stored entry plus its position in the recency index
struct Slot<V> {
    entry: CacheEntry<V>,
    seq: u64,
}

impl<V> Slot<V> {
    fn recency_key(&self) -> (Instant, u64) {
        (self.entry.last_accessed_at(), self.seq)
    }
}

/// Bounded key → entry storage for one tier
pub struct TierStore<V> {
    tier: Tier,
    capacity: usize,
    entries: HashMap<String, Slot<V>>,
    recency: BTreeMap<(Instant, u64), String>,
    /// Operation sequence, breaks `last_accessed_at` ties
    next_seq: u64,
}

impl<V> TierStore<V> {
    /// Create an empty store holding at most `capacity` entries
    pub fn new(tier: Tier, capacity: usize) -> Self {
        Self {
            tier,
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
            next_seq: 0,
        }
    }

    #[inline]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// No room for another distinct key
    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look at an entry without recording an access
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key).map(|slot| &slot.entry)
    }

    /// Record a hit on `key` and reposition it in the recency index
    pub fn touch(&mut self, key: &str, now: Instant) -> Option<&CacheEntry<V>> {
        let slot = self.entries.get_mut(key)?;
        self.recency.remove(&slot.recency_key());
        slot.entry.record_access_at(now);
        slot.seq = self.next_seq;
        self.next_seq += 1;
        self.recency.insert(slot.recency_key(), key.to_string());
        Some(&slot.entry)
    }

    /// Insert or overwrite; returns the replaced entry
    ///
    /// Never evicts. Inserting a new key into a full store is a caller bug.
    pub fn put(&mut self, key: String, entry: CacheEntry<V>) -> Option<CacheEntry<V>> {
        debug_assert!(
            self.contains(&key) || !self.is_full(),
            "{} tier overfilled: capacity {}",
            self.tier,
            self.capacity
        );

        let seq = self.next_seq;
        self.next_seq += 1;

        let slot = Slot { entry, seq };
        self.recency.insert(slot.recency_key(), key.clone());

        let old = self.entries.insert(key, slot)?;
        self.recency.remove(&old.recency_key());
        Some(old.entry)
    }

    /// Remove and return the entry for `key`
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let slot = self.entries.remove(key)?;
        self.recency.remove(&slot.recency_key());
        Some(slot.entry)
    }

    /// Key with the oldest `last_accessed_at`, earliest write or touch on ties
    pub fn find_lru_victim(&self) -> Option<&str> {
        self.recency.values().next().map(String::as_str)
    }

    /// Remove and return the LRU victim
    pub fn pop_lru(&mut self) -> Option<(String, CacheEntry<V>)> {
        let (_, key) = self.recency.pop_first()?;
        let slot = self.entries.remove(&key)?;
        Some((key, slot.entry))
    }

    /// Remove every entry expired at `now`, returning how many were removed
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }

        expired.len()
    }

    /// Keys matching `predicate`, most recently used first
    pub fn keys_where<F>(&self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&CacheEntry<V>) -> bool,
    {
        self.recency
            .values()
            .rev()
            .filter(|key| {
                self.entries
                    .get(key.as_str())
                    .is_some_and(|slot| predicate(&slot.entry))
            })
            .cloned()
            .collect()
    }

    /// Iterate over entries in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry<V>)> {
        self.entries
            .iter()
            .map(|(key, slot)| (key.as_str(), &slot.entry))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

impl<V> std::fmt::Debug for TierStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierStore")
            .field("tier", &self.tier)
            .field("capacity", &self.capacity)
            .field("len", &self.entries.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(60);

    fn entry_at(value: u32, now: Instant) -> CacheEntry<u32> {
        CacheEntry::new_at(value, TTL, now)
    }

    #[test]
    fn test_tier_order() {
        assert_eq!(Tier::Hot.colder(), Some(Tier::Warm));
        assert_eq!(Tier::Warm.colder(), Some(Tier::Cold));
        assert_eq!(Tier::Cold.colder(), None);
        assert_eq!(Tier::Cold.hotter(), Some(Tier::Warm));
        assert_eq!(Tier::Warm.hotter(), Some(Tier::Hot));
        assert_eq!(Tier::Hot.hotter(), None);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(format!("{}", Tier::Hot), "Hot");
        assert_eq!(format!("{}", Tier::Warm), "Warm");
        assert_eq!(format!("{}", Tier::Cold), "Cold");
        assert_eq!(Tier::Warm.as_str(), "warm");
    }

    #[test]
    fn test_put_and_remove() {
        let now = Instant::now();
        let mut store = TierStore::new(Tier::Hot, 4);

        assert!(store.put("a".to_string(), entry_at(1, now)).is_none());
        assert_eq!(store.len(), 1);
        assert!(store.contains("a"));
        assert_eq!(store.peek("a").map(|e| *e.value()), Some(1));

        let removed = store.remove("a").unwrap();
        assert_eq!(*removed.value(), 1);
        assert!(store.is_empty());
        assert!(store.remove("a").is_none());
        assert!(store.find_lru_victim().is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let now = Instant::now();
        let mut store = TierStore::new(Tier::Hot, 1);

        store.put("a".to_string(), entry_at(1, now));
        let old = store.put("a".to_string(), entry_at(2, now));

        assert_eq!(old.map(|e| *e.value()), Some(1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.peek("a").map(|e| *e.value()), Some(2));
        assert_eq!(store.find_lru_victim(), Some("a"));
    }

    #[test]
    fn test_is_full() {
        let now = Instant::now();
        let mut store = TierStore::new(Tier::Warm, 2);
        assert!(!store.is_full());

        store.put("a".to_string(), entry_at(1, now));
        store.put("b".to_string(), entry_at(2, now));
        assert!(store.is_full());
        assert_eq!(store.capacity(), 2);
    }

    #[test]
    fn test_lru_victim_by_last_access() {
        let base = Instant::now();
        let mut store = TierStore::new(Tier::Hot, 3);

        store.put("a".to_string(), entry_at(1, base));
        store.put("b".to_string(), entry_at(2, base + Duration::from_secs(1)));
        store.put("c".to_string(), entry_at(3, base + Duration::from_secs(2)));
        assert_eq!(store.find_lru_victim(), Some("a"));

        store.touch("a", base + Duration::from_secs(3));
        assert_eq!(store.find_lru_victim(), Some("b"));
        assert_eq!(store.peek("a").unwrap().access_count(), 2);
    }

    #[test]
    fn test_lru_ties_broken_by_insertion_order() {
        let now = Instant::now();
        let mut store = TierStore::new(Tier::Hot, 3);

        store.put("second".to_string(), entry_at(2, now));
        store.put("first".to_string(), entry_at(1, now));
        store.put("third".to_string(), entry_at(3, now));

        // Same timestamp everywhere: oldest insertion wins
        assert_eq!(store.find_lru_victim(), Some("second"));
    }

    #[test]
    fn test_touch_wins_timestamp_tie() {
        let now = Instant::now();
        let mut store = TierStore::new(Tier::Hot, 2);

        store.put("a".to_string(), entry_at(1, now));
        store.put("b".to_string(), entry_at(2, now));
        assert_eq!(store.find_lru_victim(), Some("a"));

        // Same instant as both writes: the later operation is more recent
        store.touch("a", now);
        assert_eq!(store.find_lru_victim(), Some("b"));
    }

    #[test]
    fn test_pop_lru() {
        let base = Instant::now();
        let mut store = TierStore::new(Tier::Cold, 2);

        store.put("a".to_string(), entry_at(1, base));
        store.put("b".to_string(), entry_at(2, base + Duration::from_secs(1)));

        let (key, entry) = store.pop_lru().unwrap();
        assert_eq!(key, "a");
        assert_eq!(*entry.value(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.find_lru_victim(), Some("b"));
    }

    #[test]
    fn test_touch_missing_key() {
        let mut store: TierStore<u32> = TierStore::new(Tier::Hot, 1);
        assert!(store.touch("missing", Instant::now()).is_none());
    }

    #[test]
    fn test_sweep_expired() {
        let now = Instant::now();
        let mut store = TierStore::new(Tier::Warm, 4);

        store.put(
            "short".to_string(),
            CacheEntry::new_at(1, Duration::from_secs(1), now),
        );
        store.put(
            "long".to_string(),
            CacheEntry::new_at(2, Duration::from_secs(100), now),
        );

        assert_eq!(store.sweep_expired(now), 0);
        assert_eq!(store.sweep_expired(now + Duration::from_secs(5)), 1);
        assert_eq!(store.len(), 1);
        assert!(store.contains("long"));
        assert_eq!(store.find_lru_victim(), Some("long"));
    }

    #[test]
    fn test_keys_where_most_recent_first() {
        let base = Instant::now();
        let mut store = TierStore::new(Tier::Warm, 4);

        store.put("a".to_string(), entry_at(1, base));
        store.put("b".to_string(), entry_at(2, base + Duration::from_secs(1)));
        store.put("c".to_string(), entry_at(3, base + Duration::from_secs(2)));

        let keys = store.keys_where(|e| *e.value() != 2);
        assert_eq!(keys, vec!["c".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_clear() {
        let now = Instant::now();
        let mut store = TierStore::new(Tier::Hot, 2);
        store.put("a".to_string(), entry_at(1, now));
        store.clear();

        assert!(store.is_empty());
        assert!(store.find_lru_victim().is_none());
        assert_eq!(store.iter().count(), 0);
    }
}
