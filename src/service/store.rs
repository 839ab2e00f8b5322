//! Backing Store Module
//!
//! The upstream the fetch service reads from on a cache miss, plus an
//! in-memory stand-in with simulated latency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

// == Record ==
/// A stored entity, addressed by `kind` and `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: String,
    pub id: String,
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(kind: impl Into<String>, id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            payload,
            updated_at: Utc::now(),
        }
    }

    /// Cache and store key, `"{kind}:{id}"`.
    pub fn key(&self) -> String {
        record_key(&self.kind, &self.id)
    }
}

/// Namespaces an identifier by entity kind.
pub fn record_key(kind: &str, id: &str) -> String {
    format!("{kind}:{id}")
}

// == Data Store ==
/// Slow upstream the service protects. Keys are opaque strings.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Loads a record; `Ok(None)` when the key does not exist.
    async fn fetch(&self, key: &str) -> anyhow::Result<Option<Record>>;

    async fn put(&self, key: &str, record: Record) -> anyhow::Result<()>;
}

// == Memory Store ==
/// In-memory [`DataStore`] that sleeps for a fixed latency on every call.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Record>>,
    latency: Duration,
    fetches: AtomicU64,
}

impl MemoryStore {
    pub fn new(latency: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            latency,
            fetches: AtomicU64::new(0),
        }
    }

    /// A store pre-populated with a few users and products.
    pub fn seeded(latency: Duration) -> Self {
        let records = [
            Record::new("user", "1", json!({ "name": "Ada Lovelace", "role": "admin" })),
            Record::new("user", "2", json!({ "name": "Alan Turing", "role": "member" })),
            Record::new("user", "3", json!({ "name": "Grace Hopper", "role": "member" })),
            Record::new("product", "1", json!({ "name": "Keyboard", "price_cents": 4999 })),
            Record::new("product", "2", json!({ "name": "Monitor", "price_cents": 18999 })),
        ];

        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|record| (record.key(), record))
                    .collect(),
            ),
            latency,
            fetches: AtomicU64::new(0),
        }
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn fetch(&self, key: &str) -> anyhow::Result<Option<Record>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.latency).await;
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, record: Record) -> anyhow::Result<()> {
        tokio::time::sleep(self.latency).await;
        self.records.write().await.insert(key.to_string(), record);
        Ok(())
    }
}
