//! Request DTOs for the cache sidecar API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Maximum accepted TTL (one year); the cache shadows recent writes, it is
/// not an archive.
pub const MAX_TTL_SECONDS: u64 = 31_536_000;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The logical cache key to store the value under
/// - `value`: The value to store (any JSON value)
/// - `ttl`: Optional TTL in seconds (uses the configured default if not set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The logical cache key
    pub key: String,
    /// The value to store
    pub value: serde_json::Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > 256 {
            return Some("Key exceeds maximum length of 256 characters".to_string());
        }
        if let Some(ttl) = self.ttl {
            if ttl == 0 || ttl > MAX_TTL_SECONDS {
                return Some(format!(
                    "TTL must be between 1 and {} seconds",
                    MAX_TTL_SECONDS
                ));
            }
        }
        None
    }
}

/// Request body for the pattern invalidation operation (POST /invalidate)
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Glob pattern matched against logical keys, e.g. `user:*`
    pub pattern: String,
}

impl InvalidateRequest {
    /// Validates the request data
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }
}

/// Request body for the counter operation (POST /incr/:key)
#[derive(Debug, Clone, Deserialize)]
pub struct IncrementRequest {
    /// Amount to add to the counter (default 1)
    #[serde(default = "default_amount")]
    pub amount: i64,
}

fn default_amount() -> i64 {
    1
}
