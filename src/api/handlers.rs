//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::api::middleware::ClientId;
use crate::cache::Cache;
use crate::config::Config;
use crate::dedup::DedupQueue;
use crate::error::{AppError, Result};
use crate::models::{
    validate_segment, HealthResponse, MessageResponse, PutRecordRequest, RecordResponse,
    StatsResponse,
};
use crate::rate_limit::{RateLimitStatus, RateLimiter};
use crate::service::{DataStore, FetchService, MemoryStore};

/// Application state shared across all handlers.
///
/// Every component is a cheap handle over state owned for the process
/// lifetime, so cloning the state per request is fine.
#[derive(Clone)]
pub struct AppState {
    pub service: FetchService,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(service: FetchService, limiter: RateLimiter) -> Self {
        Self { service, limiter }
    }

    /// Creates a new AppState from configuration, backed by the given store.
    pub fn from_config(config: &Config, store: Arc<dyn DataStore>) -> Self {
        let service = FetchService::new(
            Cache::new(config.cache.capacity, config.cache.ttl),
            DedupQueue::new(config.queue.clone()),
            store,
        );
        Self::new(service, RateLimiter::new(config.rate_limit.clone()))
    }

    /// Creates a new AppState over a seeded in-memory store.
    pub fn with_memory_store(config: &Config) -> Self {
        Self::from_config(config, Arc::new(MemoryStore::seeded(config.store_latency)))
    }
}

fn validate_path(kind: &str, id: &str) -> Result<()> {
    if let Some(error_msg) = validate_segment("kind", kind).or_else(|| validate_segment("id", id)) {
        return Err(AppError::InvalidRequest(error_msg));
    }
    Ok(())
}

/// Handler for GET /records/:kind/:id
///
/// Serves from the cache, falling back to one shared upstream fetch.
pub async fn get_record_handler(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<RecordResponse>> {
    validate_path(&kind, &id)?;

    match state.service.get(&kind, &id).await? {
        Some(record) => Ok(Json(RecordResponse::new(record))),
        None => Err(AppError::NotFound(format!("{kind}:{id}"))),
    }
}

/// Handler for PUT /records/:kind/:id
///
/// Writes the record through to the store and the cache.
pub async fn put_record_handler(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Json(req): Json<PutRecordRequest>,
) -> Result<Json<RecordResponse>> {
    validate_path(&kind, &id)?;
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let record = state
        .service
        .put(&kind, &id, req.payload)
        .await
        .map_err(|e| AppError::Internal(format!("{e:#}")))?;

    Ok(Json(RecordResponse::new(record)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.service.cache().stats().into(),
        queue: state.service.queue().queue_stats(),
        tracked_clients: state.limiter.tracked_clients(),
    })
}

/// Handler for POST /stats/reset
pub async fn reset_stats_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.service.cache().reset_stats();
    Json(MessageResponse::new("Cache statistics reset"))
}

/// Handler for DELETE /cache
///
/// Empties the cache; statistics are kept.
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.service.cache().clear();
    Json(MessageResponse::new("Cache cleared"))
}

/// Handler for GET /rate-limit
///
/// Reports the calling client's remaining allowance.
pub async fn rate_limit_status_handler(
    State(state): State<AppState>,
    Extension(client): Extension<ClientId>,
) -> Json<RateLimitStatus> {
    Json(state.limiter.status(&client.0))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
