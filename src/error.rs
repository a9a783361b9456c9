//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror. Errors are split into
//! infrastructure failures (absorbed by the cache manager and converted into
//! fallback reads or local-only writes) and programming errors (propagated to
//! the caller).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Remote cache could not be reached (connection refused, dropped, timed out)
    #[error("Remote cache unavailable: {0}")]
    RemoteUnavailable(String),

    /// Remote cache was reachable but the command itself failed
    #[error("Remote operation failed: {0}")]
    RemoteOperation(String),

    /// Value could not be encoded or decoded for the given key
    #[error("Serialization failed for key '{key}': {reason}")]
    Serialization { key: String, reason: String },

    /// Key not found (API layer only; the manager returns None instead)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data (API layer validation)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    // == Is Infrastructure ==
    /// Returns true for failures of the remote cache itself.
    ///
    /// Infrastructure errors are never surfaced from `get`/`set`; they are
    /// logged, counted, and converted into a fallback-store path. Everything
    /// else indicates a caller contract violation and propagates.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            CacheError::RemoteUnavailable(_) | CacheError::RemoteOperation(_)
        )
    }

    /// Builds a serialization error for the given key.
    pub fn serialization(key: impl Into<String>, err: serde_json::Error) -> Self {
        CacheError::Serialization {
            key: key.into(),
            reason: err.to_string(),
        }
    }
}

// == Redis Error Conversion ==
/// Classifies driver errors into the two infrastructure categories.
///
/// Connection-level problems (IO, refusal, drop, timeout) mean the service is
/// unavailable; anything the server answered with is an operation error.
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_timeout()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
        {
            CacheError::RemoteUnavailable(err.to_string())
        } else {
            CacheError::RemoteOperation(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::Serialization { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            CacheError::RemoteUnavailable(msg) | CacheError::RemoteOperation(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
