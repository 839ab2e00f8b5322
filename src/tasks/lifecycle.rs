//! Background task lifecycle: start everything at boot, stop it at shutdown.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::Cache;
use crate::rate_limit::RateLimiter;
use crate::tasks::{spawn_bucket_cleanup, spawn_cache_sweep};

/// Owns the recurring tasks and the token that stops them.
pub struct BackgroundTasks {
    token: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundTasks {
    /// Starts the cache sweep and the bucket cleanup.
    pub fn start<V>(cache: Cache<V>, sweep_interval: Duration, limiter: RateLimiter) -> Self
    where
        V: Clone + Send + 'static,
    {
        let token = CancellationToken::new();
        let cleanup_interval = limiter.config().cleanup_interval;

        let handles = vec![
            (
                "cache-sweep",
                spawn_cache_sweep(cache, sweep_interval, token.child_token()),
            ),
            (
                "bucket-cleanup",
                spawn_bucket_cleanup(limiter, cleanup_interval, token.child_token()),
            ),
        ];

        Self { token, handles }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signals every task to stop and waits up to `grace` for each one,
    /// aborting stragglers.
    pub async fn shutdown(self, grace: Duration) {
        self.token.cancel();

        for (name, mut handle) in self.handles {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => info!(task = name, "background task stopped"),
                Ok(Err(error)) => warn!(task = name, %error, "background task failed"),
                Err(_) => {
                    warn!(task = name, "background task did not stop in time, aborting");
                    handle.abort();
                }
            }
        }
    }
}
