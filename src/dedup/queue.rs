//! Dedup Queue Module
//!
//! Single-flight coordinator: concurrent fetches for one key share a single
//! upstream call, and the number of upstream calls running at once is capped.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::FetchError;

type FetchFuture<V> = Pin<Box<dyn Future<Output = anyhow::Result<V>> + Send>>;
type FetchFn<V> = Box<dyn FnOnce() -> FetchFuture<V> + Send>;
type Outcome<V> = Result<V, FetchError>;

// == Queue Config ==
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    /// Upper bound on fetches running at the same time, across all keys
    pub concurrency_limit: usize,
    /// Settle a fetch as failed once it runs this long. `None` waits forever.
    pub fetch_timeout: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 10,
            fetch_timeout: None,
        }
    }
}

// == Queue Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Callers currently waiting for an outcome
    pub pending_waiters: usize,
    /// Keys whose fetch is running
    pub keys_in_flight: usize,
    pub active_fetches: usize,
    /// Keys waiting for a free concurrency slot
    pub queued_keys: usize,
}

/// Per-key coordination record, alive from the first caller until settle.
struct PendingFetch<V> {
    in_flight: bool,
    /// Resolved in enqueue order
    waiters: Vec<oneshot::Sender<Outcome<V>>>,
    /// Deferred fetch while the key waits for a slot
    job: Option<FetchFn<V>>,
}

struct QueueState<V> {
    pending: HashMap<String, PendingFetch<V>>,
    /// Keys with a deferred job, in arrival order
    admission: VecDeque<String>,
    active: usize,
}

struct Inner<V> {
    state: Mutex<QueueState<V>>,
    config: QueueConfig,
}

// == Dedup Queue ==
/// Cloneable handle to one single-flight queue.
pub struct DedupQueue<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for DedupQueue<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> DedupQueue<V>
where
    V: Clone + Send + 'static,
{
    /// Creates a queue. A zero concurrency limit is raised to one.
    pub fn new(mut config: QueueConfig) -> Self {
        config.concurrency_limit = config.concurrency_limit.max(1);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    pending: HashMap::new(),
                    admission: VecDeque::new(),
                    active: 0,
                }),
                config,
            }),
        }
    }

    // == Fetch ==
    /// Resolves `key` through at most one running invocation of a fetch
    /// function.
    ///
    /// If a fetch for `key` is already running or queued, the caller joins it
    /// and `fetch_fn` is dropped without being called. Otherwise `fetch_fn` is
    /// started right away, or deferred until a concurrency slot frees up.
    /// Every caller joined to one fetch receives a clone of the same outcome.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn fetch<F, Fut>(&self, key: &str, fetch_fn: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: FetchFn<V> = Box::new(move || -> FetchFuture<V> { Box::pin(fetch_fn()) });

        let start_now = {
            let mut state = self.inner.state.lock();
            if let Some(pending) = state.pending.get_mut(key) {
                pending.waiters.push(tx);
                debug!(key, waiters = pending.waiters.len(), "joined pending fetch");
                None
            } else if state.active < self.inner.config.concurrency_limit {
                state.active += 1;
                state.pending.insert(
                    key.to_string(),
                    PendingFetch {
                        in_flight: true,
                        waiters: vec![tx],
                        job: None,
                    },
                );
                Some(job)
            } else {
                state.pending.insert(
                    key.to_string(),
                    PendingFetch {
                        in_flight: false,
                        waiters: vec![tx],
                        job: Some(job),
                    },
                );
                state.admission.push_back(key.to_string());
                debug!(key, queued = state.admission.len(), "concurrency limit reached, fetch queued");
                None
            }
        };

        if let Some(job) = start_now {
            self.launch(key.to_string(), job);
        }

        rx.await.unwrap_or(Err(FetchError::Aborted))
    }

    // == Queue Stats ==
    pub fn queue_stats(&self) -> QueueStats {
        let state = self.inner.state.lock();
        QueueStats {
            pending_waiters: state.pending.values().map(|p| p.waiters.len()).sum(),
            keys_in_flight: state.pending.values().filter(|p| p.in_flight).count(),
            active_fetches: state.active,
            queued_keys: state.admission.len(),
        }
    }

    /// Runs a fetch on its own task and settles the key when it finishes.
    ///
    /// The fetch itself runs on a nested task so a panic surfaces as a join
    /// error rather than leaving waiters pending.
    fn launch(&self, key: String, job: FetchFn<V>) {
        let queue = self.clone();
        let timeout = self.inner.config.fetch_timeout;

        tokio::spawn(async move {
            let mut handle = tokio::spawn(async move { job().await });

            let joined = match timeout {
                Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                    Ok(joined) => Ok(joined),
                    Err(_) => {
                        handle.abort();
                        Err(FetchError::TimedOut(limit))
                    }
                },
                None => Ok(handle.await),
            };

            let outcome = match joined {
                Ok(Ok(Ok(value))) => Ok(value),
                Ok(Ok(Err(error))) => Err(FetchError::UpstreamFetchFailed(Arc::new(error))),
                Ok(Err(join_error)) => {
                    warn!(key = %key, error = %join_error, "fetch task did not complete");
                    Err(FetchError::Aborted)
                }
                Err(timed_out) => Err(timed_out),
            };

            queue.settle(&key, outcome);
        });
    }

    /// Resolves every waiter of `key`, frees its slot and starts queued keys.
    fn settle(&self, key: &str, outcome: Outcome<V>) {
        let (waiters, ready) = {
            let mut state = self.inner.state.lock();
            let waiters = state
                .pending
                .remove(key)
                .map(|pending| pending.waiters)
                .unwrap_or_default();
            state.active = state.active.saturating_sub(1);
            let ready = self.admit_queued(&mut state);
            (waiters, ready)
        };

        debug!(key, waiters = waiters.len(), ok = outcome.is_ok(), "fetch settled");
        for waiter in waiters {
            // A waiter that stopped listening is not an error
            let _ = waiter.send(outcome.clone());
        }

        for (key, job) in ready {
            self.launch(key, job);
        }
    }

    /// Moves queued keys into flight while slots are free, oldest first.
    fn admit_queued(&self, state: &mut QueueState<V>) -> Vec<(String, FetchFn<V>)> {
        let mut ready = Vec::new();
        while state.active < self.inner.config.concurrency_limit {
            let Some(key) = state.admission.pop_front() else {
                break;
            };
            let Some(pending) = state.pending.get_mut(&key) else {
                continue;
            };
            let Some(job) = pending.job.take() else {
                continue;
            };
            pending.in_flight = true;
            state.active += 1;
            ready.push((key, job));
        }
        ready
    }
}
