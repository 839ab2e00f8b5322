//! Token Bucket Module
//!
//! Per-client dual bucket: a continuously refilling steady pool and a burst
//! pool that is reset to full once per burst window.

use std::time::Duration;

use tokio::time::Instant;

use crate::rate_limit::RateLimitConfig;

// == Token Bucket ==
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Steady allowance, `0.0..=max_steady`
    pub steady_tokens: f64,
    pub last_steady_refill: Instant,
    /// Burst allowance, `0..=burst_capacity`
    pub burst_tokens: u32,
    pub last_burst_window_start: Instant,
}

impl TokenBucket {
    /// A full bucket first observed at `now`.
    pub fn full(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            steady_tokens: f64::from(config.max_steady),
            last_steady_refill: now,
            burst_tokens: config.burst_capacity,
            last_burst_window_start: now,
        }
    }

    // == Refill ==
    /// Brings both pools up to date with `now`.
    pub fn refill(&mut self, config: &RateLimitConfig, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_steady_refill);
        let max_steady = f64::from(config.max_steady);
        self.steady_tokens =
            (self.steady_tokens + elapsed.as_secs_f64() * config.refill_rate_per_sec()).min(max_steady);
        self.last_steady_refill = now;

        if now.saturating_duration_since(self.last_burst_window_start) >= config.burst_window {
            self.burst_tokens = config.burst_capacity;
            self.last_burst_window_start = now;
        }
    }

    // == Try Consume ==
    /// Takes one request's worth of tokens, returning whether it was admitted.
    ///
    /// Burst admissions also debit the steady pool (floored at zero) so that
    /// sustained bursting still drains the steady allowance.
    pub fn try_consume(&mut self) -> bool {
        if self.burst_tokens > 0 {
            self.burst_tokens -= 1;
            self.steady_tokens = (self.steady_tokens - 1.0).max(0.0);
            true
        } else if self.steady_tokens >= 1.0 {
            self.steady_tokens -= 1.0;
            true
        } else {
            false
        }
    }

    // == Time Until Token ==
    /// Time until one more steady token is available; zero if one already is.
    pub fn time_until_steady_token(&self, config: &RateLimitConfig) -> Duration {
        if self.steady_tokens >= 1.0 {
            return Duration::ZERO;
        }
        let rate = config.refill_rate_per_sec();
        if rate <= 0.0 {
            return config.steady_window;
        }
        Duration::from_secs_f64((1.0 - self.steady_tokens) / rate)
    }

    /// Whether the client has been silent for at least `threshold`.
    pub fn is_idle(&self, threshold: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_steady_refill) >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RateLimitConfig {
        RateLimitConfig {
            max_steady: 10,
            steady_window: Duration::from_secs(60),
            burst_capacity: 5,
            burst_window: Duration::from_secs(10),
            ..RateLimitConfig::default()
        }
    }

    #[test]
    fn test_burst_debits_both_pools() {
        let config = config();
        let mut bucket = TokenBucket::full(&config, Instant::now());

        assert!(bucket.try_consume());

        assert_eq!(bucket.burst_tokens, 4);
        assert_eq!(bucket.steady_tokens, 9.0);
    }

    #[test]
    fn test_burst_floors_steady_at_zero() {
        let config = config();
        let mut bucket = TokenBucket::full(&config, Instant::now());
        bucket.steady_tokens = 0.4;

        assert!(bucket.try_consume());
        assert_eq!(bucket.steady_tokens, 0.0);
    }

    #[test]
    fn test_steady_only_after_burst_exhausted() {
        let config = config();
        let mut bucket = TokenBucket::full(&config, Instant::now());
        bucket.burst_tokens = 0;
        bucket.steady_tokens = 1.5;

        assert!(bucket.try_consume());
        assert!(!bucket.try_consume(), "0.5 steady tokens is not enough");
    }

    #[test]
    fn test_steady_refill_is_capped() {
        let config = config();
        let start = Instant::now();
        let mut bucket = TokenBucket::full(&config, start);
        bucket.steady_tokens = 0.0;

        bucket.refill(&config, start + Duration::from_secs(30));
        assert!((bucket.steady_tokens - 5.0).abs() < 1e-9);

        bucket.refill(&config, start + Duration::from_secs(600));
        assert_eq!(bucket.steady_tokens, 10.0);
    }

    #[test]
    fn test_burst_resets_only_after_full_window() {
        let config = config();
        let start = Instant::now();
        let mut bucket = TokenBucket::full(&config, start);
        bucket.burst_tokens = 0;

        bucket.refill(&config, start + Duration::from_millis(9_999));
        assert_eq!(bucket.burst_tokens, 0);

        bucket.refill(&config, start + Duration::from_secs(10));
        assert_eq!(bucket.burst_tokens, 5);
        assert_eq!(bucket.last_burst_window_start, start + Duration::from_secs(10));
    }

    #[test]
    fn test_time_until_steady_token() {
        let config = config();
        let mut bucket = TokenBucket::full(&config, Instant::now());

        assert_eq!(bucket.time_until_steady_token(&config), Duration::ZERO);

        // 10 tokens / 60s: one token every 6s
        bucket.steady_tokens = 0.5;
        let wait = bucket.time_until_steady_token(&config);
        assert!((wait.as_secs_f64() - 3.0).abs() < 1e-6);
    }
}
