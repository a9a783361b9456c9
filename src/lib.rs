//! Resilient Cache - a dual-tier cache layer
//!
//! Fronts a remote cache service with a circuit breaker and a process-local
//! fallback store, so callers see cache misses instead of outages.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{
    CacheHealth, CacheManager, CacheOptions, CacheStatus, CircuitBreakerConfig, CircuitState,
    RedisRemote, RemoteCache,
};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
