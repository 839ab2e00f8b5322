//! Rate Limit Module
//!
//! Per-client dual token bucket admission control.

mod bucket;
mod limiter;

pub use bucket::TokenBucket;
pub use limiter::{RateLimitConfig, RateLimitStatus, RateLimiter};
