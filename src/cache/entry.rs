//! Fallback Entry Module
//!
//! Defines the structure for individual fallback store entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

// == Fallback Entry ==
/// Represents a single entry in the local fallback store.
///
/// Every entry carries an expiry; the fallback store is a shadow of recent
/// writes, not a long-lived cache, so nothing lives in it forever.
#[derive(Debug, Clone)]
pub struct FallbackEntry {
    /// The stored value, already encoded for the wire
    pub value: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl FallbackEntry {
    // == Constructor ==
    /// Creates a new fallback entry expiring `ttl_seconds` from now.
    ///
    /// # Arguments
    /// * `value` - The encoded value to store
    /// * `ttl_seconds` - TTL in seconds
    pub fn new(value: String, ttl_seconds: u64) -> Self {
        // Saturates on absurd TTLs instead of wrapping into the past
        Self {
            value,
            expires_at: current_timestamp_ms().saturating_add(ttl_seconds.saturating_mul(1000)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is considered expired when the current time
    /// is greater than or equal to the expiration time, so an entry whose TTL
    /// has fully elapsed is never served.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
