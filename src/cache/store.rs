//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

/// Stale expiry slots tolerated before the expiry queue is compacted.
const EXPIRY_SLACK: usize = 32;

/// Outcome of one bounded expiry pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepPass {
    /// Entries physically removed during the pass
    pub removed: usize,
    /// True when no expired entry is left at the head of the expiry queue
    pub exhausted: bool,
}

#[derive(Debug)]
struct Slot<V> {
    entry: CacheEntry<V>,
    /// Write sequence, distinguishes live expiry slots from stale ones
    seq: u64,
}

// == Cache Store ==
/// Capacity-bounded store with LRU eviction and a single TTL.
///
/// All operations take the observation time explicitly; the [`Cache`] handle
/// supplies the clock.
///
/// [`Cache`]: crate::cache::Cache
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, Slot<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Keys in write order. Every entry shares one TTL, so expired entries
    /// always form a prefix of the live slots.
    expiry: VecDeque<(String, u64)>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Lifetime of every entry
    ttl: Duration,
    next_seq: u64,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore. A zero capacity is raised to one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            expiry: VecDeque::new(),
            stats: CacheStats::default(),
            capacity: capacity.max(1),
            ttl,
            next_seq: 0,
        }
    }

    // == Set ==
    /// Stores a value as the most recently used entry.
    ///
    /// An existing key gets the new value and fresh timestamps. A new key
    /// inserted into a full store first evicts exactly one entry, the least
    /// recently used.
    pub fn set(&mut self, key: String, value: V, now: Instant) {
        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite && self.entries.len() >= self.capacity {
            if let Some(evicted_key) = self.lru.evict_oldest() {
                self.entries.remove(&evicted_key);
                self.stats.record_eviction();
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        self.entries.insert(
            key.clone(),
            Slot {
                entry: CacheEntry::new(value, now),
                seq,
            },
        );
        self.lru.touch(&key);
        self.expiry.push_back((key, seq));
        self.maybe_compact_expiry();

        self.stats.track_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a live value and marks it most recently used.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<V> {
        let ttl = self.ttl;
        match self.entries.get_mut(key) {
            Some(slot) if !slot.entry.is_expired(ttl, now) => {
                slot.entry.touch(now);
                let value = slot.entry.value.clone();
                self.lru.touch(key);
                self.stats.record_lookup(true);
                Some(value)
            }
            Some(_) => {
                self.remove_entry(key);
                self.stats.record_lookup(false);
                None
            }
            None => {
                self.stats.record_lookup(false);
                None
            }
        }
    }

    // == Has ==
    /// Existence probe. Drops an expired entry like `get` does, but leaves
    /// stats and recency untouched.
    pub fn has(&mut self, key: &str, now: Instant) -> bool {
        let ttl = self.ttl;
        match self.entries.get(key) {
            Some(slot) if !slot.entry.is_expired(ttl, now) => true,
            Some(_) => {
                self.remove_entry(key);
                false
            }
            None => false,
        }
    }

    // == Clear ==
    /// Empties the store. Stats are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.expiry.clear();
        self.stats.track_entries(0);
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats;
        stats.track_entries(self.entries.len());
        stats
    }

    /// Zeroes hit, miss and eviction counters.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    // == Purge Expired ==
    /// Removes expired entries from the head of the expiry queue, examining
    /// at most `max_batch` slots.
    pub fn purge_expired(&mut self, max_batch: usize, now: Instant) -> SweepPass {
        let mut pass = SweepPass::default();
        let mut examined = 0;

        while examined < max_batch {
            let Some((key, seq)) = self.expiry.front() else {
                pass.exhausted = true;
                break;
            };

            match self.entries.get(key) {
                Some(slot) if slot.seq == *seq => {
                    if !slot.entry.is_expired(self.ttl, now) {
                        pass.exhausted = true;
                        break;
                    }
                    let key = key.clone();
                    self.remove_entry(&key);
                    pass.removed += 1;
                }
                _ => {
                    self.expiry.pop_front();
                }
            }
            examined += 1;
        }

        if examined == max_batch && !pass.exhausted {
            pass.exhausted = !self.head_is_expired(now);
        }

        self.stats.track_entries(self.entries.len());
        pass
    }

    // == Length ==
    /// Returns the number of physically stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn remove_entry(&mut self, key: &str) {
        let Some(slot) = self.entries.remove(key) else {
            return;
        };
        self.lru.remove(key);

        if matches!(self.expiry.front(), Some((k, seq)) if k == key && *seq == slot.seq) {
            self.expiry.pop_front();
        } else {
            self.maybe_compact_expiry();
        }
        self.stats.track_entries(self.entries.len());
    }

    fn head_is_expired(&self, now: Instant) -> bool {
        self.expiry.iter().find_map(|(key, seq)| {
            self.entries
                .get(key)
                .filter(|slot| slot.seq == *seq)
                .map(|slot| slot.entry.is_expired(self.ttl, now))
        }) == Some(true)
    }

    fn maybe_compact_expiry(&mut self) {
        if self.expiry.len() <= 2 * self.entries.len() + EXPIRY_SLACK {
            return;
        }
        let entries = &self.entries;
        self.expiry
            .retain(|(key, seq)| entries.get(key).is_some_and(|slot| slot.seq == *seq));
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_millis(1000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_store_new() {
        let store: CacheStore<i32> = CacheStore::new(100, TTL);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_zero_capacity_is_raised() {
        let store: CacheStore<i32> = CacheStore::new(0, TTL);
        assert_eq!(store.capacity(), 1);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new(100, TTL);
        let now = Instant::now();

        store.set("key1".to_string(), "value1".to_string(), now);

        assert_eq!(store.get("key1", now).as_deref(), Some("value1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store: CacheStore<i32> = CacheStore::new(100, TTL);
        assert_eq!(store.get("nonexistent", Instant::now()), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new(100, TTL);
        let now = Instant::now();

        store.set("key1".to_string(), 1, now);
        store.set("key1".to_string(), 2, now + ms(10));

        assert_eq!(store.get("key1", now + ms(20)), Some(2));
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_overwrite_resets_ttl() {
        let mut store = CacheStore::new(100, TTL);
        let now = Instant::now();

        store.set("key1".to_string(), 1, now);
        store.set("key1".to_string(), 2, now + ms(800));

        assert_eq!(store.get("key1", now + ms(1500)), Some(2));
        assert_eq!(store.get("key1", now + ms(1800)), None);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(100, TTL);
        let now = Instant::now();

        store.set("key1".to_string(), 1, now);

        assert_eq!(store.get("key1", now + ms(999)), Some(1));
        assert_eq!(store.get("key1", now + TTL), None);
        assert!(store.is_empty(), "expired entry is dropped on read");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_store_get_does_not_extend_ttl() {
        let mut store = CacheStore::new(100, TTL);
        let now = Instant::now();

        store.set("key1".to_string(), 1, now);
        assert_eq!(store.get("key1", now + ms(900)), Some(1));
        assert_eq!(store.get("key1", now + ms(1100)), None);
    }

    #[test]
    fn test_store_has_does_not_count() {
        let mut store = CacheStore::new(100, TTL);
        let now = Instant::now();

        store.set("key1".to_string(), 1, now);

        assert!(store.has("key1", now));
        assert!(!store.has("missing", now));
        assert_eq!(store.stats().total_requests(), 0);
    }

    #[test]
    fn test_store_has_drops_expired_without_miss() {
        let mut store = CacheStore::new(100, TTL);
        let now = Instant::now();

        store.set("key1".to_string(), 1, now);

        assert!(!store.has("key1", now + TTL));
        assert!(store.is_empty());
        assert_eq!(store.stats().misses, 0);
    }

    #[test]
    fn test_store_has_does_not_refresh_recency() {
        let mut store = CacheStore::new(2, TTL);
        let now = Instant::now();

        store.set("a".to_string(), 1, now);
        store.set("b".to_string(), 2, now);
        assert!(store.has("a", now));
        store.set("c".to_string(), 3, now);

        assert!(!store.has("a", now), "has() must not protect a from eviction");
        assert!(store.has("b", now));
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = CacheStore::new(2, TTL);
        let now = Instant::now();

        store.set("a".to_string(), 1, now);
        store.set("b".to_string(), 2, now);
        store.set("c".to_string(), 3, now);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a", now), None);
        assert_eq!(store.get("b", now), Some(2));
        assert_eq!(store.get("c", now), Some(3));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = CacheStore::new(3, TTL);
        let now = Instant::now();

        store.set("key1".to_string(), 1, now);
        store.set("key2".to_string(), 2, now);
        store.set("key3".to_string(), 3, now);

        store.get("key1", now);
        store.set("key4".to_string(), 4, now);

        assert_eq!(store.get("key1", now), Some(1));
        assert_eq!(store.get("key2", now), None);
    }

    #[test]
    fn test_store_clear_keeps_stats() {
        let mut store = CacheStore::new(10, TTL);
        let now = Instant::now();

        store.set("key1".to_string(), 1, now);
        store.get("key1", now);
        store.get("missing", now);
        store.clear();

        let stats = store.stats();
        assert!(store.is_empty());
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_store_purge_expired() {
        let mut store = CacheStore::new(100, TTL);
        let now = Instant::now();

        store.set("old".to_string(), 1, now);
        store.set("new".to_string(), 2, now + ms(500));

        let pass = store.purge_expired(64, now + ms(1200));

        assert_eq!(pass.removed, 1);
        assert!(pass.exhausted);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("new", now + ms(1200)), Some(2));
        // Sweeping is not a read
        assert_eq!(store.stats().misses, 0);
    }

    #[test]
    fn test_store_purge_skips_rewritten_keys() {
        let mut store = CacheStore::new(100, TTL);
        let now = Instant::now();

        store.set("a".to_string(), 1, now);
        store.set("b".to_string(), 2, now);
        store.set("a".to_string(), 3, now + ms(900));

        let pass = store.purge_expired(64, now + ms(1100));

        assert_eq!(pass.removed, 1);
        assert!(store.has("a", now + ms(1100)));
        assert!(!store.has("b", now + ms(1100)));
    }

    #[test]
    fn test_store_purge_is_bounded() {
        let mut store = CacheStore::new(100, TTL);
        let now = Instant::now();

        for i in 0..10 {
            store.set(format!("key{i}"), i, now);
        }

        let later = now + TTL;
        let first = store.purge_expired(4, later);
        assert_eq!(first.removed, 4);
        assert!(!first.exhausted);

        let second = store.purge_expired(4, later);
        let third = store.purge_expired(4, later);
        assert_eq!(second.removed + third.removed, 6);
        assert!(third.exhausted);
        assert!(store.is_empty());
    }
}
