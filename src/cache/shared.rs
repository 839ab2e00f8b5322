//! Shared Cache Handle
//!
//! Thread-safe handle over a [`CacheStore`] that supplies the clock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::cache::{CacheStats, CacheStore, SweepPass};

// == Cache ==
/// Cloneable handle to one cache instance.
///
/// Every operation takes the store lock for a bounded, non-suspending
/// critical section; callers never see the lock.
pub struct Cache<V> {
    store: Arc<Mutex<CacheStore<V>>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<V: Clone> Cache<V> {
    /// Creates a cache holding at most `capacity` entries, each living `ttl`.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            store: Arc::new(Mutex::new(CacheStore::new(capacity, ttl))),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.store.lock().get(key, Instant::now())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.store.lock().set(key.into(), value, Instant::now());
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.lock().has(key, Instant::now())
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn reset_stats(&self) {
        self.store.lock().reset_stats();
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// One bounded expiry pass; the lock is released before returning.
    pub fn purge_expired(&self, max_batch: usize) -> SweepPass {
        self.store.lock().purge_expired(max_batch, Instant::now())
    }
}
