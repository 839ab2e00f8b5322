//! Error types for the fetch gateway
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Fetch Error Enum ==
/// Outcome of a failed deduplicated fetch.
///
/// Cloned to every caller waiting on the same key, so the upstream error is
/// shared behind an `Arc` and all of them observe the identical value.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The upstream fetch function returned an error
    #[error("upstream fetch failed: {0}")]
    UpstreamFetchFailed(Arc<anyhow::Error>),

    /// The upstream fetch ran past the configured fetch timeout
    #[error("upstream fetch timed out after {0:?}")]
    TimedOut(Duration),

    /// The fetch task panicked or was torn down before settling
    #[error("upstream fetch aborted before completing")]
    Aborted,
}

// == App Error Enum ==
/// Error type for the HTTP layer.
#[derive(Error, Debug)]
pub enum AppError {
    /// Record not found in the backing store
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client exhausted its request allowance
    #[error("Rate limit exceeded for {0}")]
    RateLimited(String),

    /// Upstream fetch failed for every caller waiting on the key
    #[error(transparent)]
    Upstream(#[from] FetchError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(FetchError::TimedOut(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP layer.
pub type Result<T> = std::result::Result<T, AppError>;
