//! Cleanup Tasks
//!
//! Background tasks that periodically purge expired cache entries and idle
//! rate-limit buckets.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{Cache, SWEEP_BATCH};
use crate::rate_limit::RateLimiter;

/// Shortest period either task runs at; smaller intervals are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Spawns the cache TTL sweep.
///
/// Every `interval` the task purges expired entries in batches of at most
/// [`SWEEP_BATCH`] slots, releasing the cache lock and yielding between
/// batches so foreground reads and writes are never held up for a whole
/// sweep. The task exits once `token` is cancelled.
///
/// # Example
/// ```ignore
/// let token = CancellationToken::new();
/// let handle = spawn_cache_sweep(cache.clone(), Duration::from_secs(10), token.clone());
/// // Later, during shutdown:
/// token.cancel();
/// handle.await?;
/// ```
pub fn spawn_cache_sweep<V>(
    cache: Cache<V>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    let interval = interval.max(MIN_INTERVAL);
    tokio::spawn(async move {
        info!(?interval, "starting cache TTL sweep");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let mut removed = 0;
            loop {
                let pass = cache.purge_expired(SWEEP_BATCH);
                removed += pass.removed;
                if pass.exhausted || token.is_cancelled() {
                    break;
                }
                tokio::task::yield_now().await;
            }

            if removed > 0 {
                info!(removed, "cache sweep removed expired entries");
            } else {
                debug!("cache sweep found no expired entries");
            }
        }

        info!("cache TTL sweep stopped");
    })
}

/// Spawns the rate-limit bucket cleanup, dropping buckets of clients idle
/// past the limiter's inactivity threshold every `interval`.
pub fn spawn_bucket_cleanup(
    limiter: RateLimiter,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    let interval = interval.max(MIN_INTERVAL);
    tokio::spawn(async move {
        info!(?interval, "starting rate limit bucket cleanup");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let removed = limiter.cleanup_inactive();
            if removed > 0 {
                info!(removed, remaining = limiter.tracked_clients(), "dropped idle rate limit buckets");
            } else {
                debug!("no idle rate limit buckets");
            }
        }

        info!("rate limit bucket cleanup stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimitConfig;

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_unread_expired_entries() {
        let cache = Cache::new(100, Duration::from_millis(1000));
        cache.set("expire_soon", 1);
        let token = CancellationToken::new();

        let handle = spawn_cache_sweep(cache.clone(), Duration::from_millis(500), token.clone());

        tokio::time::sleep(Duration::from_millis(1600)).await;

        // Nobody read the key; only the sweep could have removed it
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().misses, 0);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_preserves_valid_entries() {
        let cache = Cache::new(100, Duration::from_secs(3600));
        cache.set("long_lived", "value");
        let token = CancellationToken::new();

        let handle = spawn_cache_sweep(cache.clone(), Duration::from_secs(1), token.clone());

        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(cache.get("long_lived"), Some("value"));

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drains_more_than_one_batch() {
        let cache = Cache::new(SWEEP_BATCH * 4, Duration::from_millis(100));
        for i in 0..SWEEP_BATCH * 3 {
            cache.set(format!("key{i}"), i);
        }
        let token = CancellationToken::new();

        let handle = spawn_cache_sweep(cache.clone(), Duration::from_millis(200), token.clone());
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(cache.is_empty());

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_minimum() {
        let cache = Cache::new(10, Duration::from_millis(50));
        cache.set("key", 1);
        let token = CancellationToken::new();

        let handle = spawn_cache_sweep(cache.clone(), Duration::ZERO, token.clone());

        tokio::time::sleep(Duration::from_millis(60)).await;
        // Expired, but the first pass is not due until MIN_INTERVAL
        assert_eq!(cache.len(), 1);

        tokio::time::sleep(MIN_INTERVAL).await;
        assert_eq!(cache.len(), 0);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_cleanup_drops_idle_clients() {
        let limiter = RateLimiter::new(RateLimitConfig {
            inactivity_threshold: Duration::from_secs(300),
            ..RateLimitConfig::default()
        });
        limiter.admit("10.0.0.1");
        let token = CancellationToken::new();

        let handle = spawn_bucket_cleanup(limiter.clone(), Duration::from_secs(60), token.clone());

        tokio::time::sleep(Duration::from_secs(250)).await;
        assert_eq!(limiter.tracked_clients(), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(limiter.tracked_clients(), 0);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_tasks_stop_on_cancel() {
        let token = CancellationToken::new();
        let sweep = spawn_cache_sweep(
            Cache::<u8>::new(1, Duration::from_secs(1)),
            Duration::from_secs(3600),
            token.clone(),
        );
        let cleanup = spawn_bucket_cleanup(
            RateLimiter::new(RateLimitConfig::default()),
            Duration::from_secs(3600),
            token.clone(),
        );

        token.cancel();

        sweep.await.unwrap();
        cleanup.await.unwrap();
    }
}
