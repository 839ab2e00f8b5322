//! Fetch Service Module
//!
//! Read-through cache in front of a [`DataStore`], with cache misses routed
//! through the single-flight queue.

use std::sync::Arc;

use tracing::debug;

use crate::cache::Cache;
use crate::dedup::DedupQueue;
use crate::error::FetchError;
use crate::service::{record_key, DataStore, Record};

// == Fetch Service ==
#[derive(Clone)]
pub struct FetchService {
    cache: Cache<Record>,
    queue: DedupQueue<Option<Record>>,
    store: Arc<dyn DataStore>,
}

impl FetchService {
    pub fn new(
        cache: Cache<Record>,
        queue: DedupQueue<Option<Record>>,
        store: Arc<dyn DataStore>,
    ) -> Self {
        Self { cache, queue, store }
    }

    pub fn cache(&self) -> &Cache<Record> {
        &self.cache
    }

    pub fn queue(&self) -> &DedupQueue<Option<Record>> {
        &self.queue
    }

    // == Get ==
    /// Returns the record for `kind`/`id`, or `None` if the store has none.
    ///
    /// A cache hit never touches the store. On a miss, concurrent callers for
    /// the same key share one store fetch, and a found record is written to
    /// the cache once by that fetch.
    pub async fn get(&self, kind: &str, id: &str) -> Result<Option<Record>, FetchError> {
        let key = record_key(kind, id);
        if let Some(record) = self.cache.get(&key) {
            return Ok(Some(record));
        }

        let store = Arc::clone(&self.store);
        let cache = self.cache.clone();
        let fetch_key = key.clone();
        self.queue
            .fetch(&key, move || async move {
                let record = store.fetch(&fetch_key).await?;
                match &record {
                    Some(record) => cache.set(fetch_key, record.clone()),
                    None => debug!(key = %fetch_key, "record not found upstream"),
                }
                Ok(record)
            })
            .await
    }

    // == Put ==
    /// Writes through to the store, then the cache. Writes skip the queue.
    pub async fn put(
        &self,
        kind: &str,
        id: &str,
        payload: serde_json::Value,
    ) -> anyhow::Result<Record> {
        let record = Record::new(kind, id, payload);
        let key = record.key();

        self.store.put(&key, record.clone()).await?;
        self.cache.set(key, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::QueueConfig;
    use crate::service::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    fn service(store: Arc<MemoryStore>) -> FetchService {
        FetchService::new(
            Cache::new(100, Duration::from_secs(60)),
            DedupQueue::new(QueueConfig::default()),
            store,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_then_hit() {
        let store = Arc::new(MemoryStore::seeded(Duration::from_millis(100)));
        let service = service(Arc::clone(&store));

        let first = service.get("user", "1").await.unwrap().unwrap();
        let second = service.get("user", "1").await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(store.fetch_count(), 1);

        let stats = service.cache().stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_hit_store_once() {
        let store = Arc::new(MemoryStore::seeded(Duration::from_millis(200)));
        let service = service(Arc::clone(&store));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.get("product", "2").await }));
        }
        for handle in handles {
            let record = handle.await.unwrap().unwrap().unwrap();
            assert_eq!(record.payload["name"], "Monitor");
        }

        assert_eq!(store.fetch_count(), 1);
        assert!(service.cache().has("product:2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_record_is_not_cached() {
        let store = Arc::new(MemoryStore::seeded(Duration::from_millis(10)));
        let service = service(Arc::clone(&store));

        assert_eq!(service.get("user", "404").await.unwrap(), None);
        assert_eq!(service.get("user", "404").await.unwrap(), None);

        assert_eq!(store.fetch_count(), 2);
        assert!(service.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_writes_through() {
        let store = Arc::new(MemoryStore::new(Duration::from_millis(10)));
        let service = service(Arc::clone(&store));

        let written = service
            .put("user", "7", json!({ "name": "Edsger Dijkstra" }))
            .await
            .unwrap();

        assert_eq!(service.get("user", "7").await.unwrap(), Some(written.clone()));
        assert_eq!(store.fetch_count(), 0, "read served from cache");
        assert_eq!(store.fetch("user:7").await.unwrap(), Some(written));
    }
}
