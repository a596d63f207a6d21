//! Per-layer circuit breaker
//!
//! Three-state gate (closed, open, half-open) over a sliding window of
//! request outcomes. An open circuit lets the coordinator skip an unhealthy
//! backend in bounded time; after a timeout the breaker admits a probe and
//! closes again once enough probes succeed.
//!
//! Timeouts are reconciled lazily against the injected clock inside
//! `allows_request` and `state`; the breaker owns no timers or background
//! tasks.

pub mod config;
pub mod window;

use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_utils::CachePadded;

use crate::cache::clock::Clock;
use crate::cache::types::statistics::BreakerStats;
pub use config::CircuitBreakerConfig;
use window::OutcomeWindow;

/// Breaker state as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BreakerState {
    /// Traffic flows, outcomes are recorded into the window
    #[serde(rename = "closed")]
    Closed,
    /// Traffic is blocked until the retry timeout elapses
    #[serde(rename = "open")]
    Open,
    /// Probe traffic is admitted; one failure reopens
    #[serde(rename = "half_open")]
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::Open => write!(f, "open"),
            BreakerState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Mutable breaker runtime, guarded by the per-breaker mutex
#[derive(Debug)]
struct BreakerCore {
    state: BreakerState,
    window: OutcomeWindow,
    opened_at: Option<u64>,
    half_open_successes: u32,
}

impl BreakerCore {
    fn new(window_size: usize) -> Self {
        Self {
            state: BreakerState::Closed,
            window: OutcomeWindow::new(window_size),
            opened_at: None,
            half_open_successes: 0,
        }
    }
}

/// Sliding-window circuit breaker for one cache layer
///
/// All state lives behind a single mutex; layers are independent, so each
/// breaker pads its core onto its own cache line rather than sharing a
/// coarser lock.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    core: CachePadded<Mutex<BreakerCore>>,
}

impl CircuitBreaker {
    /// Create a closed breaker with an empty window
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let window_size = config.window_size;
        Self {
            config,
            clock,
            core: CachePadded::new(Mutex::new(BreakerCore::new(window_size))),
        }
    }

    /// Breaker class identifier for the status surface
    pub fn kind(&self) -> &'static str {
        "sliding_window"
    }

    /// Configuration this breaker was built with
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock_core(&self) -> MutexGuard<'_, BreakerCore> {
        match self.core.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Move an expired open circuit to half-open
    fn reconcile_timeout(&self, core: &mut BreakerCore) {
        if core.state != BreakerState::Open {
            return;
        }
        if let Some(opened_at) = core.opened_at {
            if self.clock.now().saturating_sub(opened_at) >= self.config.timeout_secs {
                core.state = BreakerState::HalfOpen;
                core.opened_at = None;
                core.half_open_successes = 0;
            }
        }
    }

    fn open(&self, core: &mut BreakerCore) {
        // The window is retained; it is cleared only when the circuit closes
        core.state = BreakerState::Open;
        core.opened_at = Some(self.clock.now());
        core.half_open_successes = 0;
    }

    fn close(&self, core: &mut BreakerCore) {
        core.state = BreakerState::Closed;
        core.window.clear();
        core.opened_at = None;
        core.half_open_successes = 0;
    }

    /// Evaluated after every recorded outcome in the closed state; only a
    /// full window can trip, and an all-success window never reaches the
    /// threshold
    fn check_threshold(&self, core: &mut BreakerCore) {
        if core.window.is_full() && core.window.failure_rate() >= self.config.failure_threshold {
            self.open(core);
        }
    }

    /// Whether a request may pass through to the backend
    ///
    /// Applies the timeout transition first, so the first caller after the
    /// retry timeout becomes the half-open probe.
    pub fn allows_request(&self) -> bool {
        let mut core = self.lock_core();
        self.reconcile_timeout(&mut core);
        core.state != BreakerState::Open
    }

    /// Record a successful backend call
    pub fn record_success(&self) {
        let mut core = self.lock_core();
        match core.state {
            BreakerState::HalfOpen => {
                core.half_open_successes += 1;
                if core.half_open_successes >= self.config.success_threshold {
                    self.close(&mut core);
                }
            }
            BreakerState::Closed => {
                core.window.record(true);
                self.check_threshold(&mut core);
            }
            BreakerState::Open => {}
        }
    }

    /// Record a failed backend call
    pub fn record_failure(&self) {
        let mut core = self.lock_core();
        match core.state {
            BreakerState::HalfOpen => self.open(&mut core),
            BreakerState::Closed => {
                core.window.record(false);
                self.check_threshold(&mut core);
            }
            BreakerState::Open => {}
        }
    }

    /// Current state, with the timeout transition applied
    pub fn state(&self) -> BreakerState {
        let mut core = self.lock_core();
        self.reconcile_timeout(&mut core);
        core.state
    }

    /// Snapshot of the outcome window
    pub fn stats(&self) -> BreakerStats {
        let core = self.lock_core();
        BreakerStats::from_counts(core.window.len(), core.window.failures())
    }

    /// Force the circuit open, as if the threshold had tripped now
    pub fn force_open(&self) {
        let mut core = self.lock_core();
        self.open(&mut core);
    }

    /// Force the circuit closed, clearing the window
    pub fn force_close(&self) {
        let mut core = self.lock_core();
        self.close(&mut core);
    }

    /// Return the breaker to an empty closed state
    pub fn reset(&self) {
        self.force_close();
    }
}
