//! Cache Module
//!
//! Dual-tier (remote + local) key/value cache fronted by a circuit breaker.

mod breaker;
mod entry;
mod fallback;
mod manager;
mod metrics;
mod remote;

#[cfg(test)]
pub mod test_support;

// Re-export public types
pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use entry::FallbackEntry;
pub use fallback::FallbackStore;
pub use manager::{CacheHealth, CacheManager, CacheOptions, CacheStatus};
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use remote::{RedisRemote, RemoteCache};

// == Public Constants ==
/// Default TTL in seconds for entries without explicit TTL
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Default namespace prefix applied to every logical key
pub const DEFAULT_KEY_PREFIX: &str = "app";
