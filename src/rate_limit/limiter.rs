//! Rate Limiter Module
//!
//! Keeps one [`TokenBucket`] per client and decides admission.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use crate::rate_limit::TokenBucket;

// == Rate Limit Config ==
/// Pool sizes and windows, shared by every client.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Steady pool capacity
    pub max_steady: u32,
    /// Time for an empty steady pool to refill completely
    pub steady_window: Duration,
    /// Burst pool capacity
    pub burst_capacity: u32,
    /// Interval after which the burst pool is reset to full
    pub burst_window: Duration,
    /// How often idle buckets are swept
    pub cleanup_interval: Duration,
    /// Silence after which a client's bucket is dropped
    pub inactivity_threshold: Duration,
}

impl RateLimitConfig {
    /// Steady tokens regained per second.
    pub fn refill_rate_per_sec(&self) -> f64 {
        let window = self.steady_window.as_secs_f64();
        if window <= 0.0 {
            return f64::from(self.max_steady);
        }
        f64::from(self.max_steady) / window
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_steady: 100,
            steady_window: Duration::from_secs(60),
            burst_capacity: 20,
            burst_window: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(60),
            inactivity_threshold: Duration::from_secs(300),
        }
    }
}

// == Rate Limit Status ==
/// Read-only view of one client's bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitStatus {
    /// Whole steady tokens left
    pub remaining: u32,
    pub burst_remaining: u32,
    /// Milliseconds until another steady token is available
    pub reset_in_millis: u64,
    /// Configured steady + burst pool sizes
    pub limit: u32,
}

// == Rate Limiter ==
/// Per-client admission control. Cloning yields another handle to the same
/// bucket map.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
    config: Arc<RateLimitConfig>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    // == Admit ==
    /// Decides whether `client_id` may make one more request right now.
    ///
    /// Unknown clients start with a full bucket.
    pub fn admit(&self, client_id: &str) -> bool {
        self.admit_with_status(client_id).0
    }

    /// Admission decision together with the allowance left after it, taken
    /// under one lock so the two always agree.
    pub fn admit_with_status(&self, client_id: &str) -> (bool, RateLimitStatus) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(client_id.to_string())
            .or_insert_with(|| TokenBucket::full(&self.config, now));

        bucket.refill(&self.config, now);
        let allowed = bucket.try_consume();

        trace!(
            client = client_id,
            allowed,
            steady = bucket.steady_tokens,
            burst = bucket.burst_tokens,
            "rate limit decision"
        );
        (allowed, self.describe(bucket))
    }

    // == Status ==
    /// Reports a client's allowance after applying pending refill.
    ///
    /// Clients with no bucket yet are reported as full and are not tracked.
    pub fn status(&self, client_id: &str) -> RateLimitStatus {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        match buckets.get_mut(client_id) {
            Some(bucket) => {
                bucket.refill(&self.config, now);
                self.describe(bucket)
            }
            None => self.describe(&TokenBucket::full(&self.config, now)),
        }
    }

    fn describe(&self, bucket: &TokenBucket) -> RateLimitStatus {
        let wait = bucket.time_until_steady_token(&self.config);
        RateLimitStatus {
            remaining: bucket.steady_tokens.floor() as u32,
            burst_remaining: bucket.burst_tokens,
            reset_in_millis: wait.as_millis().try_into().unwrap_or(u64::MAX),
            limit: self.config.max_steady.saturating_add(self.config.burst_capacity),
        }
    }

    // == Cleanup ==
    /// Drops buckets of clients idle longer than the inactivity threshold.
    ///
    /// Returns the number of buckets removed.
    pub fn cleanup_inactive(&self) -> usize {
        let now = Instant::now();
        let threshold = self.config.inactivity_threshold;
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| !bucket.is_idle(threshold, now));
        before - buckets.len()
    }

    /// Number of clients currently holding a bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().len()
    }
}
