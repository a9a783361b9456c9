//! Remote Cache Module
//!
//! Boundary to the remote cache service. The trait keeps the manager testable;
//! the production implementation wraps a multiplexed, auto-reconnecting redis
//! connection and bounds every call with a timeout so a hung remote is
//! indistinguishable from an unreachable one.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::error::{CacheError, Result};

// == Remote Cache Trait ==
/// Operations the remote cache service must support.
///
/// Values crossing this boundary are opaque encoded strings; the cache manager
/// owns encode/decode.
#[async_trait]
pub trait RemoteCache: Send + Sync {
    /// GET key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// SETEX key ttl value
    async fn set_ex(&self, key: &str, ttl_seconds: u64, value: &str) -> Result<()>;

    /// DEL key... — returns the number of keys removed
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// KEYS pattern
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// INCRBY key amount — returns the new counter value
    async fn incr_by(&self, key: &str, amount: i64) -> Result<i64>;

    /// FLUSHDB
    async fn flush(&self) -> Result<()>;

    /// PING — liveness probe
    async fn ping(&self) -> Result<()>;
}

// == Redis Remote ==
/// Production remote backed by redis.
///
/// `ConnectionManager` multiplexes one connection and reconnects on its own;
/// cloning it is cheap and shares the underlying pipe.
pub struct RedisRemote {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisRemote {
    // == Connect ==
    /// Connects to the remote cache service.
    ///
    /// Fails only when the URL is malformed or the initial connection cannot
    /// be established; later outages are handled by the circuit breaker, not
    /// here.
    pub async fn connect(url: &str, op_timeout_ms: u64) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(timeout_ms = op_timeout_ms, "Connected to remote cache");
        Ok(Self {
            conn,
            op_timeout: Duration::from_millis(op_timeout_ms),
        })
    }

    /// Runs a remote command under the per-call timeout.
    ///
    /// A timeout is classified as the remote being unavailable, the same as
    /// any other connection-level failure.
    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, redis::RedisError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::RemoteUnavailable(format!(
                "operation timed out after {}ms",
                self.op_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl RemoteCache for RedisRemote {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set_ex(&self, key: &str, ttl_seconds: u64, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let value = value.to_string();
        self.bounded(async move { conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await })
            .await
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let keys = keys.to_vec();
        self.bounded(async move { conn.del::<_, u64>(keys).await })
            .await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = pattern.to_string();
        self.bounded(async move { conn.keys::<_, Vec<String>>(pattern).await })
            .await
    }

    async fn incr_by(&self, key: &str, amount: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        self.bounded(async move { conn.incr::<_, _, i64>(key, amount).await })
            .await
    }

    async fn flush(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded(async move {
            redis::cmd("FLUSHDB").query_async::<()>(&mut conn).await
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded(async move {
            redis::cmd("PING").query_async::<()>(&mut conn).await
        })
        .await
    }
}
