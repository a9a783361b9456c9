//! API Handlers
//!
//! HTTP request handlers for the cache sidecar endpoints. The handlers are a
//! thin shell over the cache manager; resilience decisions live below them.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::cache::{CacheHealth, CacheManager, CacheOptions};
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, IncrementRequest, IncrementResponse,
    InvalidateRequest, InvalidateResponse, SetRequest, SetResponse,
};

/// Application state shared across all handlers.
///
/// The cache manager is constructed once at startup and injected here; the
/// handlers never build their own.
#[derive(Clone)]
pub struct AppState {
    /// The dual-tier cache façade
    pub cache: Arc<CacheManager>,
}

impl AppState {
    /// Creates a new AppState around an existing cache manager.
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }
}

/// Optional key prefix override accepted on get/delete.
#[derive(Debug, Default, Deserialize)]
pub struct PrefixQuery {
    /// Namespace prefix; defaults to the configured one
    pub prefix: Option<String>,
}

/// Handler for PUT /set
///
/// Stores a key-value pair through the cache layer. The response is a success
/// even when the remote tier is down; the value is then held locally only.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    match req.ttl {
        Some(ttl) => state.cache.setex(&req.key, ttl, &req.value).await?,
        None => state.cache.set(&req.key, &req.value, None).await?,
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value through the cache layer; 404 when neither tier holds it.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PrefixQuery>,
) -> Result<Json<GetResponse>> {
    let opts = query.prefix.map(|prefix| CacheOptions {
        key_prefix: prefix,
        ..CacheOptions::default()
    });

    let value: Option<serde_json::Value> = state.cache.get(&key, opts.as_ref()).await?;

    match value {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Deletes a key from both tiers.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PrefixQuery>,
) -> Result<Json<DeleteResponse>> {
    state.cache.del(&key, query.prefix.as_deref()).await;
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /incr/:key
///
/// Increments a remote counter; returns 0 when the remote is unavailable.
pub async fn increment_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<IncrementRequest>,
) -> Json<IncrementResponse> {
    let value = state.cache.increment(&key, req.amount).await;
    Json(IncrementResponse { key, value })
}

/// Handler for POST /invalidate
///
/// Deletes all remote keys matching a glob pattern.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state.cache.invalidate_pattern(&req.pattern).await;
    Ok(Json(InvalidateResponse {
        pattern: req.pattern,
        removed,
    }))
}

/// Handler for GET /metrics
///
/// Returns the operational health view: counters, circuit state, fallback size.
pub async fn metrics_handler(State(state): State<AppState>) -> Json<CacheHealth> {
    Json(state.cache.metrics().await)
}

/// Handler for GET /health
///
/// Probes remote liveness directly, independent of the circuit breaker.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.cache.status().await;
    Json(HealthResponse::new(status, state.cache.circuit_state()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::ScriptedRemote;
    use crate::cache::CircuitBreakerConfig;
    use std::time::Duration;

    fn test_state() -> AppState {
        let remote = ScriptedRemote::arc();
        let cache = CacheManager::new(
            remote,
            CircuitBreakerConfig {
                failure_threshold: 5,
                success_threshold: 2,
                timeout: Duration::from_millis(100),
            },
            "app",
            3600,
            60,
        );
        AppState::new(Arc::new(cache))
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let req = SetRequest {
            key: "test_key".to_string(),
            value: serde_json::json!("test_value"),
            ttl: None,
        };
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let result = get_handler(
            State(state),
            Path("test_key".to_string()),
            Query(PrefixQuery::default()),
        )
        .await;
        let response = result.unwrap();
        assert_eq!(response.value, serde_json::json!("test_value"));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(
            State(state),
            Path("nonexistent".to_string()),
            Query(PrefixQuery::default()),
        )
        .await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();

        let req = SetRequest {
            key: "to_delete".to_string(),
            value: serde_json::json!("value"),
            ttl: None,
        };
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        let result = delete_handler(
            State(state.clone()),
            Path("to_delete".to_string()),
            Query(PrefixQuery::default()),
        )
        .await;
        assert!(result.is_ok());

        let result = get_handler(
            State(state),
            Path("to_delete".to_string()),
            Query(PrefixQuery::default()),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_metrics_handler() {
        let state = test_state();

        let response = metrics_handler(State(state)).await;
        assert_eq!(response.metrics.hits, 0);
        assert_eq!(response.metrics.misses, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let state = test_state();

        let response = health_handler(State(state)).await;
        assert_eq!(response.status, crate::cache::CacheStatus::Healthy);
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state();

        let req = SetRequest {
            key: "".to_string(), // Empty key is invalid
            value: serde_json::json!("value"),
            ttl: None,
        };
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_increment_handler() {
        let state = test_state();

        let response = increment_handler(
            State(state),
            Path("counter".to_string()),
            Json(IncrementRequest { amount: 3 }),
        )
        .await;
        assert_eq!(response.value, 3);
    }
}
