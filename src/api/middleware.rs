//! Rate limiting middleware
//!
//! Admits or rejects each request by client address before it reaches a
//! handler, and reports the remaining allowance in response headers.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::api::AppState;
use crate::error::AppError;
use crate::rate_limit::RateLimitStatus;

/// Identifier the rate limiter keys buckets on, made available to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    /// Peer IP of the connection, or `"unknown"` when the server was not
    /// started with connect info.
    pub fn from_request(request: &Request) -> Self {
        let id = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Self(id)
    }
}

/// Rejects the request with 429 when the client's buckets are empty.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let client = ClientId::from_request(&request);
    let (allowed, status) = state.limiter.admit_with_status(&client.0);

    let mut response = if allowed {
        request.extensions_mut().insert(client);
        next.run(request).await
    } else {
        warn!(client = %client.0, "rate limit exceeded");
        AppError::RateLimited(client.0).into_response()
    };

    add_rate_limit_headers(response.headers_mut(), &status);
    response
}

/// Adds `X-RateLimit-*` headers describing the client's allowance.
pub fn add_rate_limit_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    let values = [
        ("x-ratelimit-limit", status.limit.to_string()),
        ("x-ratelimit-remaining", status.remaining.to_string()),
        ("x-ratelimit-burst-remaining", status.burst_remaining.to_string()),
        ("x-ratelimit-reset", status.reset_in_millis.to_string()),
    ];

    for (name, value) in values {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}
