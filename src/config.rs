//! Configuration Module
//!
//! Handles loading and managing cache layer configuration from environment
//! variables.

use std::env;
use std::time::Duration;

use crate::cache::CircuitBreakerConfig;

/// Cache layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection URL for the remote cache service
    pub redis_url: String,
    /// Namespace prefix applied to every logical key
    pub key_prefix: String,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Background fallback sweep interval in seconds
    pub sweep_interval: u64,
    /// Per-call timeout for remote cache operations in milliseconds
    pub remote_timeout_ms: u64,
    /// Consecutive remote failures before the circuit opens
    pub failure_threshold: u32,
    /// Consecutive probe successes before the circuit closes again
    pub success_threshold: u32,
    /// Time in milliseconds the circuit stays open before allowing a probe
    pub circuit_timeout_ms: u64,
    /// HTTP port for the operational sidecar
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Remote cache URL (default: redis://127.0.0.1:6379)
    /// - `CACHE_KEY_PREFIX` - Key namespace prefix (default: app)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `CACHE_SWEEP_INTERVAL` - Fallback sweep frequency in seconds (default: 60)
    /// - `CACHE_REMOTE_TIMEOUT_MS` - Per-call remote timeout (default: 250)
    /// - `CIRCUIT_FAILURE_THRESHOLD` - Failures before opening (default: 5)
    /// - `CIRCUIT_SUCCESS_THRESHOLD` - Successes before closing (default: 2)
    /// - `CIRCUIT_TIMEOUT_MS` - Open-state cooldown (default: 60000)
    /// - `SERVER_PORT` - Sidecar HTTP port (default: 3000)
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or_else(|_| "app".to_string()),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            remote_timeout_ms: env::var("CACHE_REMOTE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(250),
            failure_threshold: env::var("CIRCUIT_FAILURE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            success_threshold: env::var("CIRCUIT_SUCCESS_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            circuit_timeout_ms: env::var("CIRCUIT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60_000),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }

    /// Returns the circuit breaker configuration derived from this config.
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout: Duration::from_millis(self.circuit_timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "app".to_string(),
            default_ttl: 3600,
            sweep_interval: 60,
            remote_timeout_ms: 250,
            failure_threshold: 5,
            success_threshold: 2,
            circuit_timeout_ms: 60_000,
            server_port: 3000,
        }
    }
}
