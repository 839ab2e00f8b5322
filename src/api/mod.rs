//! API Module
//!
//! HTTP handlers, routing and rate limiting for the gateway REST API.
//!
//! # Endpoints
//! - `GET /records/:kind/:id` - Read a record
//! - `PUT /records/:kind/:id` - Write a record
//! - `GET /stats` - Cache and queue statistics
//! - `POST /stats/reset` - Reset cache statistics
//! - `DELETE /cache` - Clear the cache
//! - `GET /rate-limit` - Caller's rate limit status
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::ClientId;
pub use routes::create_router;
