//! Herdgate - request admission and result caching server
//!
//! Serves records from a slow store through an LRU/TTL cache, a
//! single-flight fetch queue and per-client rate limiting.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herdgate::api::create_router;
use herdgate::{AppState, BackgroundTasks, Config};

/// Time each background task gets to stop before it is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Main entry point for the Herdgate server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create cache, dedup queue, rate limiter and backing store
/// 4. Start background cache sweep and bucket cleanup
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herdgate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Herdgate");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        cache_capacity = config.cache.capacity,
        cache_ttl = ?config.cache.ttl,
        concurrency_limit = config.queue.concurrency_limit,
        fetch_timeout = ?config.queue.fetch_timeout,
        max_steady = config.rate_limit.max_steady,
        burst_capacity = config.rate_limit.burst_capacity,
        "Configuration loaded"
    );

    let state = AppState::with_memory_store(&config);

    let tasks = BackgroundTasks::start(
        state.service.cache().clone(),
        config.cache.sweep_interval,
        state.limiter.clone(),
    );
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    // Peer addresses feed the per-client rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tasks.shutdown(SHUTDOWN_GRACE).await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
