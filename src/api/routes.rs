//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_cache_handler, get_record_handler, health_handler, put_record_handler,
    rate_limit_status_handler, reset_stats_handler, stats_handler, AppState,
};
use super::middleware::rate_limit_middleware;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /records/:kind/:id` - Read a record through the cache
/// - `PUT /records/:kind/:id` - Write a record through to store and cache
/// - `GET /stats` - Cache and queue statistics
/// - `POST /stats/reset` - Reset cache statistics
/// - `DELETE /cache` - Clear the cache
/// - `GET /rate-limit` - Caller's rate limit status
/// - `GET /health` - Health check endpoint (not rate limited)
///
/// # Middleware
/// - Rate limiting: per client address, on every route but `/health`
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let limited = Router::new()
        .route(
            "/records/:kind/:id",
            get(get_record_handler).put(put_record_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/stats/reset", post(reset_stats_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/rate-limit", get(rate_limit_status_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(limited)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
