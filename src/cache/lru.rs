//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{HashMap, VecDeque};

/// Stale slots tolerated before the order queue is compacted.
const COMPACT_SLACK: usize = 32;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy in O(1) amortized time.
///
/// Every touch appends `(key, stamp)` to the back of the queue and records the
/// stamp as the key's current one. Older slots for the same key become stale
/// and are skipped when they reach the front:
/// - Front = Least recently used
/// - Back = Most recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Access order, possibly containing stale slots
    order: VecDeque<(String, u64)>,
    /// Current stamp of every tracked key
    stamps: HashMap<String, u64>,
    /// Next stamp to hand out
    next_stamp: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &str) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;

        self.stamps.insert(key.to_string(), stamp);
        self.order.push_back((key.to_string(), stamp));
        self.maybe_compact();
    }

    // == Remove ==
    /// Stops tracking a key. Its queue slots go stale and are dropped lazily.
    pub fn remove(&mut self, key: &str) {
        if self.stamps.remove(key).is_some() {
            self.maybe_compact();
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        while let Some((key, stamp)) = self.order.pop_front() {
            if self.stamps.get(&key) == Some(&stamp) {
                self.stamps.remove(&key);
                return Some(key);
            }
        }
        None
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
        self.stamps.clear();
    }

    /// Drops stale slots once they outnumber live keys, keeping the queue
    /// within a constant factor of the live set.
    fn maybe_compact(&mut self) {
        if self.order.len() <= 2 * self.stamps.len() + COMPACT_SLACK {
            return;
        }
        let stamps = &self.stamps;
        self.order
            .retain(|(key, stamp)| stamps.get(key) == Some(stamp));
    }

    #[cfg(test)]
    fn queue_len(&self) -> usize {
        self.order.len()
    }
}
