//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache sweep: removes expired cache entries nobody reads again
//! - Bucket cleanup: drops rate-limit buckets of idle clients

mod cleanup;
mod lifecycle;

pub use cleanup::{spawn_bucket_cleanup, spawn_cache_sweep, MIN_INTERVAL};
pub use lifecycle::BackgroundTasks;
