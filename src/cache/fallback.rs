//! Local Fallback Store Module
//!
//! Process-local, time-bounded key/value store used when the remote cache is
//! unavailable, and continuously written through on every successful set so it
//! can serve reads immediately after a remote outage without a cold start.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::FallbackEntry;

// == Fallback Store ==
/// Thread-safe local shadow of recent cache writes.
///
/// Keys stored here are already prefixed; one entry per prefixed key. Expired
/// entries are deleted lazily on read and in batches by the background sweep.
#[derive(Debug, Default)]
pub struct FallbackStore {
    /// Prefixed key to entry mapping
    entries: RwLock<HashMap<String, FallbackEntry>>,
}

impl FallbackStore {
    // == Constructor ==
    /// Creates an empty fallback store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Retrieves a value by prefixed key.
    ///
    /// Returns the encoded value if present and not expired. Expired entries
    /// are evicted on read and reported as absent.
    pub async fn get(&self, key: &str) -> Option<String> {
        // Fast path: read lock only while the entry is live
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                None => return None,
                Some(_) => {} // expired, fall through to evict
            }
        }

        // Lazy eviction needs the write lock; re-check under it
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.is_expired() {
                entries.remove(key);
                debug!(key = %key, "Evicted expired fallback entry on read");
                return None;
            }
            return Some(entry.value.clone());
        }
        None
    }

    // == Set ==
    /// Stores an encoded value under a prefixed key with the given TTL.
    ///
    /// Overwrites any existing entry and resets its expiry.
    pub async fn set(&self, key: String, value: String, ttl_seconds: u64) {
        let entry = FallbackEntry::new(value, ttl_seconds);
        let mut entries = self.entries.write().await;
        entries.insert(key, entry);
    }

    // == Remove ==
    /// Removes an entry by prefixed key. Returns true if an entry existed.
    pub async fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(key).is_some()
    }

    // == Clear ==
    /// Removes all entries.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    // == Sweep ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    // == Length ==
    /// Returns the current number of entries, including not-yet-swept expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    /// Returns true if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = FallbackStore::new();

        store.set("app:key1".to_string(), "value1".to_string(), 60).await;
        let value = store.get("app:key1").await;

        assert_eq!(value, Some("value1".to_string()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = FallbackStore::new();
        assert_eq!(store.get("app:missing").await, None);
    }

    #[tokio::test]
    async fn test_overwrite_resets_value_and_ttl() {
        let store = FallbackStore::new();

        store.set("app:key1".to_string(), "value1".to_string(), 60).await;
        store.set("app:key1".to_string(), "value2".to_string(), 60).await;

        assert_eq!(store.get("app:key1").await, Some("value2".to_string()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_evicted_on_read() {
        let store = FallbackStore::new();

        store.set("app:key1".to_string(), "value1".to_string(), 1).await;
        assert!(store.get("app:key1").await.is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        // Read returns None and removes the entry
        assert_eq!(store.get("app:key1").await, None);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = FallbackStore::new();

        store.set("app:key1".to_string(), "value1".to_string(), 60).await;
        assert!(store.remove("app:key1").await);
        assert!(!store.remove("app:key1").await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = FallbackStore::new();

        store.set("app:key1".to_string(), "value1".to_string(), 60).await;
        store.set("app:key2".to_string(), "value2".to_string(), 60).await;
        store.clear().await;

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let store = FallbackStore::new();

        store.set("app:short".to_string(), "value".to_string(), 1).await;
        store.set("app:long".to_string(), "value".to_string(), 60).await;

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let removed = store.sweep().await;
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get("app:long").await.is_some());
    }
}
