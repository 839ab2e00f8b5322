//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use shared::Cache;
pub use stats::CacheStats;
pub use store::{CacheStore, SweepPass};

// == Public Constants ==
/// Maximum number of expiry slots examined per locked sweep pass
pub const SWEEP_BATCH: usize = 256;
