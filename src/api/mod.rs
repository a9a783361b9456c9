//! API Module
//!
//! HTTP handlers and routing for the cache sidecar REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key from both tiers
//! - `POST /incr/:key` - Increment a remote counter
//! - `POST /invalidate` - Delete remote keys by glob pattern
//! - `GET /metrics` - Metrics, circuit state, and fallback size
//! - `GET /health` - Remote liveness probe

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
