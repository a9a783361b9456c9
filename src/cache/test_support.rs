//! Test Support
//!
//! Scriptable in-memory remote used by unit tests across the crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cache::RemoteCache;
use crate::error::{CacheError, Result};

/// In-memory remote whose failure mode toggles at runtime. Every call is
/// counted so tests can assert the remote was never contacted.
#[derive(Default)]
pub struct ScriptedRemote {
    pub store: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
    calls: AtomicU64,
}

impl ScriptedRemote {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Switches all subsequent calls between succeeding and failing with
    /// a connection-level error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of remote calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::RemoteUnavailable(
                "connection refused".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteCache for ScriptedRemote {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.store.lock().get(key).cloned())
    }

    async fn set_ex(&self, key: &str, _ttl_seconds: u64, value: &str) -> Result<()> {
        self.check()?;
        self.store.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        self.check()?;
        let mut store = self.store.lock();
        let mut removed = 0;
        for key in keys {
            if store.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.check()?;
        let needle = pattern.trim_end_matches('*');
        Ok(self
            .store
            .lock()
            .keys()
            .filter(|k| k.starts_with(needle))
            .cloned()
            .collect())
    }

    async fn incr_by(&self, key: &str, amount: i64) -> Result<i64> {
        self.check()?;
        let mut store = self.store.lock();
        let current: i64 = store.get(key).and_then(|v| v.parse().ok()).unwrap_or(0);
        let next = current + amount;
        store.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn flush(&self) -> Result<()> {
        self.check()?;
        self.store.lock().clear();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }
}
