//! Cache Metrics Module
//!
//! Tracks cache layer metrics: hits, misses, sets, deletes, errors, fallback
//! hits, and circuit breaker trips. Counters are atomic so concurrent
//! operations never lose updates; derived ratios are computed at snapshot time
//! from raw counts to avoid drift.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Metrics ==
/// Monotonic operation counters for one cache manager.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
    fallback_hits: AtomicU64,
    circuit_breaker_trips: AtomicU64,
}

// == Metrics Snapshot ==
/// Non-destructive point-in-time view of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Number of remote cache hits
    pub hits: u64,
    /// Number of lookups that found nothing in either tier
    pub misses: u64,
    /// Number of set operations
    pub sets: u64,
    /// Number of delete operations
    pub deletes: u64,
    /// Number of absorbed remote errors
    pub errors: u64,
    /// Number of lookups served from the local fallback store
    pub fallback_hits: u64,
    /// Number of times the circuit breaker tripped open
    pub circuit_breaker_trips: u64,
    /// hits / (hits + misses), 0.0 when no lookups were classified yet
    pub hit_rate: f64,
}

impl CacheMetrics {
    // == Constructor ==
    /// Creates a new metrics collector with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the remote hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the set counter.
    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the delete counter.
    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the absorbed-error counter.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the fallback hit counter.
    pub fn record_fallback_hit(&self) {
        self.fallback_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the circuit breaker trip counter.
    pub fn record_trip(&self) {
        self.circuit_breaker_trips.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Returns a point-in-time view of all counters.
    ///
    /// Fallback hits are tracked separately and do not enter the hit rate;
    /// the rate measures the remote tier only.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        MetricsSnapshot {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            fallback_hits: self.fallback_hits.load(Ordering::Relaxed),
            circuit_breaker_trips: self.circuit_breaker_trips.load(Ordering::Relaxed),
            hit_rate,
        }
    }
}
