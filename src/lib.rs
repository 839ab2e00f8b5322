//! Herdgate - request admission and result caching
//!
//! An LRU/TTL cache, a single-flight fetch queue and per-client token
//! buckets in front of a slow key-addressed data store.

pub mod api;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod service;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::BackgroundTasks;
