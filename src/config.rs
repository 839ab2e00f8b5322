//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::dedup::QueueConfig;
use crate::rate_limit::RateLimitConfig;
use crate::tasks::MIN_INTERVAL;

/// Cache sizing and expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Lifetime of every entry
    pub ttl: Duration,
    /// How often expired entries are swept
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    pub cache: CacheConfig,
    pub queue: QueueConfig,
    pub rate_limit: RateLimitConfig,
    /// Simulated latency of the in-memory backing store
    pub store_latency: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL_MS` - Entry lifetime (default: 60000)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Expiry sweep frequency (default: 10000)
    /// - `QUEUE_CONCURRENCY` - Concurrent upstream fetches (default: 10)
    /// - `FETCH_TIMEOUT_MS` - Upstream fetch timeout (default: none)
    /// - `RATE_LIMIT_MAX_STEADY` - Steady pool size (default: 100)
    /// - `RATE_LIMIT_STEADY_WINDOW_MS` - Steady refill window (default: 60000)
    /// - `RATE_LIMIT_BURST_CAPACITY` - Burst pool size (default: 20)
    /// - `RATE_LIMIT_BURST_WINDOW_MS` - Burst reset window (default: 10000)
    /// - `RATE_LIMIT_CLEANUP_INTERVAL_MS` - Idle bucket sweep frequency (default: 60000)
    /// - `RATE_LIMIT_INACTIVITY_MS` - Idle time before a bucket is dropped (default: 300000)
    /// - `STORE_LATENCY_MS` - Mock store latency (default: 100)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache: CacheConfig {
                capacity: env_or("CACHE_CAPACITY", defaults.cache.capacity).max(1),
                ttl: env_millis_or("CACHE_TTL_MS", defaults.cache.ttl),
                sweep_interval: env_interval_or(
                    "CACHE_SWEEP_INTERVAL_MS",
                    defaults.cache.sweep_interval,
                ),
            },
            queue: QueueConfig {
                concurrency_limit: env_or(
                    "QUEUE_CONCURRENCY",
                    defaults.queue.concurrency_limit,
                )
                .max(1),
                fetch_timeout: env_parse::<u64>("FETCH_TIMEOUT_MS").map(Duration::from_millis),
            },
            rate_limit: RateLimitConfig {
                max_steady: env_or("RATE_LIMIT_MAX_STEADY", defaults.rate_limit.max_steady),
                steady_window: env_millis_or(
                    "RATE_LIMIT_STEADY_WINDOW_MS",
                    defaults.rate_limit.steady_window,
                ),
                burst_capacity: env_or(
                    "RATE_LIMIT_BURST_CAPACITY",
                    defaults.rate_limit.burst_capacity,
                ),
                burst_window: env_millis_or(
                    "RATE_LIMIT_BURST_WINDOW_MS",
                    defaults.rate_limit.burst_window,
                ),
                cleanup_interval: env_interval_or(
                    "RATE_LIMIT_CLEANUP_INTERVAL_MS",
                    defaults.rate_limit.cleanup_interval,
                ),
                inactivity_threshold: env_millis_or(
                    "RATE_LIMIT_INACTIVITY_MS",
                    defaults.rate_limit.inactivity_threshold,
                ),
            },
            store_latency: env_millis_or("STORE_LATENCY_MS", defaults.store_latency),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache: CacheConfig::default(),
            queue: QueueConfig::default(),
            rate_limit: RateLimitConfig::default(),
            store_latency: Duration::from_millis(100),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env_parse(name).unwrap_or(default)
}

fn env_millis_or(name: &str, default: Duration) -> Duration {
    env_parse::<u64>(name)
        .map(Duration::from_millis)
        .unwrap_or(default)
}

/// Like [`env_millis_or`] for task periods, never below [`MIN_INTERVAL`].
fn env_interval_or(name: &str, default: Duration) -> Duration {
    env_millis_or(name, default).max(MIN_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.cache.sweep_interval, Duration::from_secs(10));
        assert_eq!(config.queue.concurrency_limit, 10);
        assert_eq!(config.queue.fetch_timeout, None);
        assert_eq!(config.rate_limit.cleanup_interval, Duration::from_secs(60));
        assert_eq!(config.rate_limit.inactivity_threshold, Duration::from_secs(300));
    }

    #[test]
    fn test_env_parsing_helpers() {
        env::set_var("HERDGATE_TEST_PORT", " 8080 ");
        env::set_var("HERDGATE_TEST_BAD", "not-a-number");
        env::set_var("HERDGATE_TEST_MS", "250");

        assert_eq!(env_or("HERDGATE_TEST_PORT", 1u16), 8080);
        assert_eq!(env_or("HERDGATE_TEST_BAD", 7u32), 7);
        assert_eq!(env_or("HERDGATE_TEST_MISSING", 9usize), 9);
        assert_eq!(
            env_millis_or("HERDGATE_TEST_MS", Duration::ZERO),
            Duration::from_millis(250)
        );
        assert_eq!(env_parse::<u64>("HERDGATE_TEST_MISSING"), None);

        env::remove_var("HERDGATE_TEST_PORT");
        env::remove_var("HERDGATE_TEST_BAD");
        env::remove_var("HERDGATE_TEST_MS");
    }

    #[test]
    fn test_zero_task_interval_is_clamped() {
        env::set_var("HERDGATE_TEST_ZERO_INTERVAL", "0");

        assert_eq!(
            env_interval_or("HERDGATE_TEST_ZERO_INTERVAL", Duration::from_secs(10)),
            MIN_INTERVAL
        );
        assert_eq!(
            env_interval_or("HERDGATE_TEST_UNSET_INTERVAL", Duration::from_secs(10)),
            Duration::from_secs(10)
        );

        env::remove_var("HERDGATE_TEST_ZERO_INTERVAL");
    }
}
