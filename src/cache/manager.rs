//! Cache Manager Module
//!
//! Public façade over the dual-tier cache. For every hot-path operation it
//! consults the circuit breaker, attempts the remote cache when permitted,
//! falls back to the local store on denial or failure, and always keeps the
//! local store warm as a safety net. Administrative operations go straight to
//! the remote and degrade to logged no-ops instead.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheMetrics, CircuitBreaker, CircuitBreakerConfig, CircuitState, FallbackStore,
    MetricsSnapshot, RemoteCache, DEFAULT_KEY_PREFIX, DEFAULT_TTL_SECONDS,
};
use crate::error::{CacheError, Result};
use crate::tasks::spawn_sweep_task;

// == Cache Options ==
/// Per-call options for `get`/`set`.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// TTL in seconds for the entry (default 3600)
    pub ttl_seconds: u64,
    /// Namespace prefix for the key (default "app")
    pub key_prefix: String,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl CacheOptions {
    /// Options with an explicit TTL and the default prefix.
    pub fn with_ttl(ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            ..Self::default()
        }
    }
}

// == Cache Status ==
/// Tri-state liveness of the remote cache, independent of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Remote answered the probe
    Healthy,
    /// Remote was reachable but the probe command failed
    Unhealthy,
    /// Remote could not be reached
    Disconnected,
}

// == Cache Health ==
/// Single operational view: metrics merged with circuit state and fallback size.
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    /// Counter snapshot
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
    /// Current circuit breaker state
    pub circuit_state: CircuitState,
    /// Number of entries currently in the local fallback store
    pub fallback_entries: usize,
}

// == Cache Manager ==
/// Dual-tier cache façade.
///
/// Constructed once at the application's composition root and passed by
/// reference to consumers. All state lives for the process lifetime; `close`
/// only stops the background sweep, and the remote connection is released when
/// the manager is dropped.
pub struct CacheManager {
    remote: Arc<dyn RemoteCache>,
    fallback: Arc<FallbackStore>,
    breaker: CircuitBreaker,
    metrics: CacheMetrics,
    key_prefix: String,
    default_ttl: u64,
    sweep_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a cache manager over the given remote and spawns the fallback
    /// sweep task.
    ///
    /// # Arguments
    /// * `remote` - Remote cache boundary (production: `RedisRemote`)
    /// * `breaker_config` - Circuit breaker thresholds
    /// * `key_prefix` - Default namespace prefix for logical keys
    /// * `default_ttl` - Default TTL in seconds
    /// * `sweep_interval` - Fallback sweep interval in seconds
    pub fn new(
        remote: Arc<dyn RemoteCache>,
        breaker_config: CircuitBreakerConfig,
        key_prefix: impl Into<String>,
        default_ttl: u64,
        sweep_interval: u64,
    ) -> Self {
        let fallback = Arc::new(FallbackStore::new());
        let sweep_handle = spawn_sweep_task(fallback.clone(), sweep_interval);

        Self {
            remote,
            fallback,
            breaker: CircuitBreaker::new(breaker_config),
            metrics: CacheMetrics::new(),
            key_prefix: key_prefix.into(),
            default_ttl,
            sweep_handle: Mutex::new(Some(sweep_handle)),
        }
    }

    // == Key Namespacing ==
    /// Transforms a logical key into its prefixed form.
    ///
    /// Prevents collisions when the same remote store backs multiple logical
    /// caches.
    fn prefixed(&self, key: &str, prefix: Option<&str>) -> String {
        format!("{}:{}", prefix.unwrap_or(&self.key_prefix), key)
    }

    /// Records a remote failure against the breaker and the error counter.
    fn note_remote_failure(&self, key: &str, err: &CacheError) {
        warn!(key = %key, error = %err, "Remote cache operation failed");
        if self.breaker.on_failure(err) {
            self.metrics.record_trip();
        }
        self.metrics.record_error();
    }

    /// Reads the fallback tier, classifying the outcome.
    async fn fallback_lookup<T: DeserializeOwned>(&self, prefixed: &str) -> Result<Option<T>> {
        match self.fallback.get(prefixed).await {
            Some(raw) => {
                self.metrics.record_fallback_hit();
                debug!(key = %prefixed, "Served from local fallback store");
                let value = serde_json::from_str(&raw)
                    .map_err(|e| CacheError::serialization(prefixed, e))?;
                Ok(Some(value))
            }
            None => {
                self.metrics.record_miss();
                Ok(None)
            }
        }
    }

    // == Get ==
    /// Retrieves a value, remote tier first.
    ///
    /// The remote is the source of truth when both tiers hold the key. A
    /// remote miss is a breaker success (a reachable-but-empty remote is not
    /// unhealthy) and falls through to the local tier as a secondary source.
    /// Remote errors and breaker denial both route to the fallback store.
    /// Only decode failures propagate.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        opts: Option<&CacheOptions>,
    ) -> Result<Option<T>> {
        let prefixed = self.prefixed(key, opts.map(|o| o.key_prefix.as_str()));

        if !self.breaker.can_execute() {
            debug!(key = %prefixed, "Circuit open, reading fallback store");
            return self.fallback_lookup(&prefixed).await;
        }

        match self.remote.get(&prefixed).await {
            Ok(Some(raw)) => {
                self.breaker.on_success();
                self.metrics.record_hit();
                let value = serde_json::from_str(&raw)
                    .map_err(|e| CacheError::serialization(&prefixed, e))?;
                Ok(Some(value))
            }
            Ok(None) => {
                self.breaker.on_success();
                self.fallback_lookup(&prefixed).await
            }
            Err(err) => {
                self.note_remote_failure(&prefixed, &err);
                self.fallback_lookup(&prefixed).await
            }
        }
    }

    // == Set ==
    /// Stores a value in both tiers.
    ///
    /// The local fallback store is written first so the safety net is current
    /// even if the remote write fails or is skipped. Remote failures are
    /// absorbed; from the caller's perspective `set` only fails on encode
    /// errors.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        opts: Option<&CacheOptions>,
    ) -> Result<()> {
        let prefixed = self.prefixed(key, opts.map(|o| o.key_prefix.as_str()));
        let ttl = opts.map(|o| o.ttl_seconds).unwrap_or(self.default_ttl);

        let raw = serde_json::to_string(value)
            .map_err(|e| CacheError::serialization(&prefixed, e))?;

        self.fallback.set(prefixed.clone(), raw.clone(), ttl).await;
        self.metrics.record_set();

        if !self.breaker.can_execute() {
            debug!(key = %prefixed, "Circuit open, wrote local tier only");
            return Ok(());
        }

        match self.remote.set_ex(&prefixed, ttl, &raw).await {
            Ok(()) => self.breaker.on_success(),
            Err(err) => self.note_remote_failure(&prefixed, &err),
        }
        Ok(())
    }

    // == Setex ==
    /// Stores a value with an explicit TTL under the default prefix.
    pub async fn setex<T: Serialize>(&self, key: &str, ttl_seconds: u64, value: &T) -> Result<()> {
        self.set(key, value, Some(&CacheOptions::with_ttl(ttl_seconds)))
            .await
    }

    // == Delete ==
    /// Removes a key from both tiers.
    ///
    /// The local removal always happens; the remote DEL is attempted directly
    /// (no breaker gate) and its failure is absorbed and counted.
    pub async fn del(&self, key: &str, prefix: Option<&str>) {
        let prefixed = self.prefixed(key, prefix);

        self.fallback.remove(&prefixed).await;
        self.metrics.record_delete();

        if let Err(err) = self.remote.del(&[prefixed.clone()]).await {
            warn!(key = %prefixed, error = %err, "Remote delete failed");
            self.metrics.record_error();
        }
    }

    // == Increment ==
    /// Atomically increments a remote counter.
    ///
    /// Counters have no local substitute; on remote failure this logs, counts
    /// the error, and returns 0.
    pub async fn increment(&self, key: &str, amount: i64) -> i64 {
        let prefixed = self.prefixed(key, None);
        match self.remote.incr_by(&prefixed, amount).await {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %prefixed, error = %err, "Remote increment failed");
                self.metrics.record_error();
                0
            }
        }
    }

    // == Invalidate Pattern ==
    /// Deletes all remote keys matching a glob pattern (within the default
    /// prefix). Returns the number of keys removed, 0 on remote failure.
    ///
    /// There is no local substitute for a pattern scan; stale fallback entries
    /// age out by TTL instead.
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let prefixed = self.prefixed(pattern, None);

        let keys = match self.remote.keys(&prefixed).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(pattern = %prefixed, error = %err, "Remote pattern scan failed");
                self.metrics.record_error();
                return 0;
            }
        };
        if keys.is_empty() {
            return 0;
        }

        match self.remote.del(&keys).await {
            Ok(removed) => {
                info!(pattern = %prefixed, removed, "Invalidated keys by pattern");
                removed
            }
            Err(err) => {
                warn!(pattern = %prefixed, error = %err, "Remote pattern delete failed");
                self.metrics.record_error();
                0
            }
        }
    }

    // == Get Pattern ==
    /// Fetches all remote key/value pairs matching a glob pattern (within the
    /// default prefix). Returns an empty map on remote failure; keys in the
    /// result have the prefix stripped back to their logical form.
    pub async fn get_pattern(&self, pattern: &str) -> HashMap<String, serde_json::Value> {
        let prefix = format!("{}:", self.key_prefix);
        let prefixed = self.prefixed(pattern, None);

        let keys = match self.remote.keys(&prefixed).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(pattern = %prefixed, error = %err, "Remote pattern scan failed");
                self.metrics.record_error();
                return HashMap::new();
            }
        };

        let mut result = HashMap::new();
        for key in keys {
            match self.remote.get(&key).await {
                Ok(Some(raw)) => {
                    let value = match serde_json::from_str(&raw) {
                        Ok(value) => value,
                        Err(err) => {
                            warn!(key = %key, error = %err, "Skipping undecodable value during pattern fetch");
                            continue;
                        }
                    };
                    let logical = key.strip_prefix(&prefix).unwrap_or(&key).to_string();
                    result.insert(logical, value);
                }
                Ok(None) => {} // expired between KEYS and GET
                Err(err) => {
                    warn!(key = %key, error = %err, "Remote read failed during pattern fetch");
                    self.metrics.record_error();
                }
            }
        }
        result
    }

    // == Flush ==
    /// Clears both tiers.
    ///
    /// The local clear always happens; the remote FLUSHDB failure is absorbed
    /// and counted.
    pub async fn flush(&self) {
        self.fallback.clear().await;
        if let Err(err) = self.remote.flush().await {
            warn!(error = %err, "Remote flush failed");
            self.metrics.record_error();
        } else {
            info!("Cache flushed");
        }
    }

    // == Metrics ==
    /// Returns the operational health view: counters, circuit state, and
    /// fallback store size.
    pub async fn metrics(&self) -> CacheHealth {
        CacheHealth {
            metrics: self.metrics.snapshot(),
            circuit_state: self.breaker.state(),
            fallback_entries: self.fallback.len().await,
        }
    }

    // == Circuit Controls ==
    /// Returns the current circuit breaker state.
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Operational override: open the circuit (all traffic to the fallback tier).
    pub fn open_circuit(&self) {
        self.breaker.force_open();
    }

    /// Operational override: close the circuit.
    pub fn close_circuit(&self) {
        self.breaker.force_close();
    }

    // == Status ==
    /// Probes remote liveness with a PING, independent of the breaker.
    ///
    /// Intended for external health-check endpoints, not for gating traffic.
    pub async fn status(&self) -> CacheStatus {
        match self.remote.ping().await {
            Ok(()) => CacheStatus::Healthy,
            Err(CacheError::RemoteUnavailable(_)) => CacheStatus::Disconnected,
            Err(_) => CacheStatus::Unhealthy,
        }
    }

    // == Close ==
    /// Stops the background sweep task.
    ///
    /// The remote connection is released when the manager is dropped; local
    /// state and metrics are simply discarded with the process.
    pub fn close(&self) {
        if let Some(handle) = self.sweep_handle.lock().take() {
            handle.abort();
            info!("Cache manager closed, sweep task stopped");
        }
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        // A dropped manager must not leave its sweep task running
        if let Some(handle) = self.sweep_handle.lock().take() {
            handle.abort();
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cache::test_support::ScriptedRemote;

    fn manager_with(remote: Arc<ScriptedRemote>) -> CacheManager {
        CacheManager::new(
            remote,
            CircuitBreakerConfig {
                failure_threshold: 5,
                success_threshold: 2,
                timeout: Duration::from_millis(100),
            },
            "app",
            3600,
            60,
        )
    }

    #[tokio::test]
    async fn test_set_then_get_healthy_remote() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote);

        cache
            .set("x", &"1".to_string(), Some(&CacheOptions::with_ttl(60)))
            .await
            .unwrap();
        let value: Option<String> = cache.get("x", None).await.unwrap();

        assert_eq!(value, Some("1".to_string()));
        let health = cache.metrics().await;
        assert_eq!(health.metrics.hits, 1);
        assert_eq!(health.metrics.sets, 1);
        assert_eq!(health.circuit_state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_forced_open_serves_fallback_without_remote() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());

        cache.set("x", &42u64, None).await.unwrap();
        let calls_after_set = remote.calls();

        cache.open_circuit();
        let value: Option<u64> = cache.get("x", None).await.unwrap();

        assert_eq!(value, Some(42));
        assert_eq!(remote.calls(), calls_after_set, "remote must not be contacted");
        assert_eq!(cache.metrics().await.metrics.fallback_hits, 1);
    }

    #[tokio::test]
    async fn test_five_failures_trip_the_circuit_once() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());
        remote.set_failing(true);

        for _ in 0..5 {
            let _: Option<String> = cache.get("x", None).await.unwrap();
        }

        assert_eq!(cache.circuit_state(), CircuitState::Open);
        let health = cache.metrics().await;
        assert_eq!(health.metrics.circuit_breaker_trips, 1);
        assert_eq!(health.metrics.errors, 5);
    }

    #[tokio::test]
    async fn test_remote_error_falls_back_to_local() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());

        cache.set("x", &"shadow".to_string(), None).await.unwrap();
        remote.set_failing(true);

        let value: Option<String> = cache.get("x", None).await.unwrap();
        assert_eq!(value, Some("shadow".to_string()));

        let health = cache.metrics().await;
        assert_eq!(health.metrics.fallback_hits, 1);
        assert_eq!(health.metrics.errors, 1);
    }

    #[tokio::test]
    async fn test_remote_miss_consults_fallback_and_is_not_a_failure() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());

        // Seed only the local tier
        cache.set("x", &"local".to_string(), None).await.unwrap();
        remote.store.lock().remove("app:x");

        let value: Option<String> = cache.get("x", None).await.unwrap();
        assert_eq!(value, Some("local".to_string()));
        assert_eq!(cache.metrics().await.metrics.fallback_hits, 1);

        // A consistently-miss remote never trips the breaker
        for _ in 0..20 {
            let _: Option<String> = cache.get("absent", None).await.unwrap();
        }
        assert_eq!(cache.circuit_state(), CircuitState::Closed);
        assert_eq!(cache.metrics().await.metrics.circuit_breaker_trips, 0);
    }

    #[tokio::test]
    async fn test_set_survives_remote_outage() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());
        remote.set_failing(true);

        // set never fails outward on infrastructure errors
        cache.set("x", &"kept".to_string(), None).await.unwrap();

        let value: Option<String> = cache.get("x", None).await.unwrap();
        assert_eq!(value, Some("kept".to_string()));
    }

    #[tokio::test]
    async fn test_custom_prefix_namespacing() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());

        let opts = CacheOptions {
            ttl_seconds: 60,
            key_prefix: "tenant9".to_string(),
        };
        cache.set("x", &"v".to_string(), Some(&opts)).await.unwrap();

        assert!(remote.store.lock().contains_key("tenant9:x"));
        let value: Option<String> = cache.get("x", Some(&opts)).await.unwrap();
        assert_eq!(value, Some("v".to_string()));

        // Default prefix does not see the tenant's key
        let value: Option<String> = cache.get("x", None).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_decode_error_propagates() {
        let remote = ScriptedRemote::arc();
        remote
            .store
            .lock()
            .insert("app:x".to_string(), "not json at all".to_string());
        let cache = manager_with(remote);

        let result: Result<Option<u64>> = cache.get("x", None).await;
        assert!(matches!(result, Err(CacheError::Serialization { .. })));
    }

    #[tokio::test]
    async fn test_del_removes_both_tiers() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());

        cache.set("x", &"v".to_string(), None).await.unwrap();
        cache.del("x", None).await;

        assert!(!remote.store.lock().contains_key("app:x"));
        let value: Option<String> = cache.get("x", None).await.unwrap();
        assert_eq!(value, None);
        assert_eq!(cache.metrics().await.metrics.deletes, 1);
    }

    #[tokio::test]
    async fn test_admin_operations_default_on_failure() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());
        remote.set_failing(true);

        assert_eq!(cache.increment("counter", 1).await, 0);
        assert_eq!(cache.invalidate_pattern("user:*").await, 0);
        assert!(cache.get_pattern("user:*").await.is_empty());
        cache.del("x", None).await;
        cache.flush().await;

        let health = cache.metrics().await;
        assert!(health.metrics.errors >= 5);
        // Admin operations never feed the breaker gate
        assert_eq!(cache.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_increment_and_patterns() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote);

        assert_eq!(cache.increment("counter", 1).await, 1);
        assert_eq!(cache.increment("counter", 5).await, 6);

        cache.set("user:1", &"alice".to_string(), None).await.unwrap();
        cache.set("user:2", &"bob".to_string(), None).await.unwrap();
        cache.set("other", &"x".to_string(), None).await.unwrap();

        let matched = cache.get_pattern("user:*").await;
        assert_eq!(matched.len(), 2);
        assert_eq!(
            matched.get("user:1"),
            Some(&serde_json::Value::String("alice".to_string()))
        );

        assert_eq!(cache.invalidate_pattern("user:*").await, 2);
        // Deleted remotely but the fallback shadow still holds it
        let value: Option<String> = cache.get("user:1", None).await.unwrap();
        assert_eq!(value, Some("alice".to_string()));
    }

    #[tokio::test]
    async fn test_setex_extreme_ttl_is_stored_not_expired() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote);

        cache.setex("x", u64::MAX, &"v".to_string()).await.unwrap();

        let value: Option<String> = cache.get("x", None).await.unwrap();
        assert_eq!(value, Some("v".to_string()));

        // The shadow entry must be live too, not wrapped into the past
        cache.open_circuit();
        let value: Option<String> = cache.get("x", None).await.unwrap();
        assert_eq!(value, Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_get_pattern_skips_undecodable_values() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());

        cache.set("user:1", &"alice".to_string(), None).await.unwrap();
        remote
            .store
            .lock()
            .insert("app:user:2".to_string(), "not json at all".to_string());

        let matched = cache.get_pattern("user:*").await;
        assert_eq!(matched.len(), 1);
        assert_eq!(
            matched.get("user:1"),
            Some(&serde_json::Value::String("alice".to_string()))
        );
        assert!(!matched.contains_key("user:2"));
    }

    #[tokio::test]
    async fn test_flush_clears_both_tiers() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());

        cache.set("x", &"v".to_string(), None).await.unwrap();
        cache.flush().await;

        assert!(remote.store.lock().is_empty());
        assert_eq!(cache.metrics().await.fallback_entries, 0);
    }

    #[tokio::test]
    async fn test_status_tristate() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote.clone());

        assert_eq!(cache.status().await, CacheStatus::Healthy);

        remote.set_failing(true);
        assert_eq!(cache.status().await, CacheStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_close_stops_sweep_task() {
        let remote = ScriptedRemote::arc();
        let cache = manager_with(remote);

        cache.close();
        // Second close is a no-op
        cache.close();
    }
}
