//! Dedup Module
//!
//! Request coalescing for upstream fetches.

mod queue;

pub use queue::{DedupQueue, QueueConfig, QueueStats};
