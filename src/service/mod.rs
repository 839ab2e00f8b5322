//! Service Module
//!
//! Composes the cache and the dedup queue over a backing store.

mod fetch;
mod store;

pub use fetch::FetchService;
pub use store::{record_key, DataStore, MemoryStore, Record};
