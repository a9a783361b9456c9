//! Circuit Breaker Module
//!
//! Three-state machine (Closed/Open/HalfOpen) that decides, independent of any
//! specific operation, whether the remote cache may currently be attempted.
//! Failures are classified uniformly: the breaker does not care whether the
//! remote timed out, refused the connection, or returned a protocol error.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::CacheError;

// == Circuit State ==
/// Current operational mode of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, remote attempts allowed
    Closed,
    /// Remote is considered down, attempts denied until the cooldown elapses
    Open,
    /// Cooldown elapsed, probe attempts allowed to test recovery
    HalfOpen,
}

// == Circuit Breaker Config ==
/// Breaker thresholds, immutable after construction.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures while Closed before the circuit opens
    pub failure_threshold: u32,
    /// Consecutive probe successes while HalfOpen before the circuit closes
    pub success_threshold: u32,
    /// How long the circuit stays Open before permitting a probe
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_millis(60_000),
        }
    }
}

// == Breaker Inner State ==
/// Mutable counters and state, guarded together by one mutex so that
/// concurrent operations observe consistent transitions.
#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_at: Option<Instant>,
}

// == Circuit Breaker ==
/// Guard around the remote cache.
///
/// The asymmetry between opening (several failures) and reopening from
/// HalfOpen (a single failure) prevents flapping when the remote service is
/// intermittently healthy. The breaker never errors; it only classifies.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    // == Constructor ==
    /// Creates a new breaker in the Closed state.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_failure_at: None,
            }),
        }
    }

    // == Can Execute ==
    /// Returns whether a remote attempt is currently permitted.
    ///
    /// While Open this is a time-gated allow: once the cooldown has elapsed the
    /// permitting call moves the state to HalfOpen *before* the attempt is
    /// made, and the caller is expected to immediately attempt the operation
    /// and report the outcome via `on_success`/`on_failure`. Concurrent callers
    /// may all observe the gated window as open; more than one probe in flight
    /// is tolerated rather than serialized.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| at.elapsed() >= self.config.timeout)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_successes = 0;
                    info!("Circuit breaker half-open, probing remote cache");
                    true
                } else {
                    false
                }
            }
        }
    }

    // == On Success ==
    /// Records a successful remote attempt.
    ///
    /// A remote miss counts as a success here: a reachable-but-empty remote is
    /// not unhealthy and must never trip the breaker.
    pub fn on_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    info!("Circuit breaker closed, remote cache recovered");
                }
            }
            // Success reported while Open means a probe raced the gate; ignore
            CircuitState::Open => {}
        }
    }

    // == On Failure ==
    /// Records a failed remote attempt.
    ///
    /// Returns true when this failure tripped the circuit to Open, so the
    /// caller can count breaker trips.
    pub fn on_failure(&self, err: &CacheError) -> bool {
        let mut inner = self.inner.lock();
        inner.last_failure_at = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!(
                        consecutive_failures = inner.consecutive_failures,
                        error = %err,
                        "Circuit breaker opened, failing fast"
                    );
                    return true;
                }
                false
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.consecutive_successes = 0;
                warn!(error = %err, "Probe failed, circuit breaker reopened");
                true
            }
            CircuitState::Open => false,
        }
    }

    // == State ==
    /// Returns the current state.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    // == Force Open ==
    /// Operational override: open the circuit regardless of counters.
    pub fn force_open(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Open;
        inner.last_failure_at = Some(Instant::now());
        warn!("Circuit breaker forced open");
    }

    // == Force Close ==
    /// Operational override: close the circuit and reset all counters.
    pub fn force_close(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.last_failure_at = None;
        warn!("Circuit breaker forced closed");
    }
}
