//! Guarded layer
//!
//! Pairs one backend with its circuit breaker. Every operation follows the
//! same pattern: gate on the breaker, invoke the backend, record the
//! outcome, propagate the result. Writes wrap the payload into the stored
//! envelope; reads hand the stored entry back verbatim and leave
//! interpretation (expiry, legacy formats) to the coordinator.

use std::sync::Arc;

use crate::cache::backend::{BackendError, CacheBackend, StoredEntry};
use crate::cache::breaker::CircuitBreaker;
use crate::cache::clock::Clock;
use crate::cache::dependency::DependencyMetadata;
use crate::cache::envelope::WrappedValue;
use crate::cache::types::statistics::{LayerCounters, LayerStatus};

/// Failure of a guarded layer operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    /// The breaker is open; the backend was not touched
    Unavailable,
    /// The backend call failed; the breaker counted one failure
    Backend(BackendError),
}

impl std::fmt::Display for LayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerError::Unavailable => write!(f, "Layer circuit is open"),
            LayerError::Backend(e) => write!(f, "Layer backend failed: {}", e),
        }
    }
}

impl std::error::Error for LayerError {}

/// One tier of the stack: backend, breaker, TTL ceiling, counters
pub struct GuardedLayer<V> {
    index: usize,
    backend: Arc<dyn CacheBackend<V>>,
    breaker: CircuitBreaker,
    layer_ttl: Option<u64>,
    counters: LayerCounters,
    clock: Arc<dyn Clock>,
}

impl<V> GuardedLayer<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        index: usize,
        backend: Arc<dyn CacheBackend<V>>,
        breaker: CircuitBreaker,
        layer_ttl: Option<u64>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            index,
            backend,
            breaker,
            layer_ttl,
            counters: LayerCounters::new(),
            clock,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Per-tier TTL ceiling in seconds, if configured
    pub fn layer_ttl(&self) -> Option<u64> {
        self.layer_ttl
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    fn gate(&self) -> Result<(), LayerError> {
        if self.breaker.allows_request() {
            Ok(())
        } else {
            Err(LayerError::Unavailable)
        }
    }

    /// Fetch the stored entry under `key`, whatever its format
    pub fn get_value(&self, key: &str) -> Result<Option<StoredEntry<V>>, LayerError> {
        self.gate()?;
        match self.backend.get(key) {
            Ok(found) => {
                self.breaker.record_success();
                if found.is_some() {
                    self.counters.record_hit();
                } else {
                    self.counters.record_miss();
                }
                Ok(found)
            }
            Err(e) => {
                self.breaker.record_failure();
                self.counters.record_error();
                Err(LayerError::Backend(e))
            }
        }
    }

    /// Wrap and store a value; `ttl` is already clamped by the coordinator
    pub fn set_value(
        &self,
        key: &str,
        value: V,
        ttl: u64,
        dependency: Option<DependencyMetadata>,
    ) -> Result<bool, LayerError> {
        self.gate()?;
        let wrapped = WrappedValue::from_ttl(value, self.clock.now(), ttl, dependency);
        match self.backend.set(key, StoredEntry::Wrapped(wrapped), backend_ttl(ttl)) {
            Ok(stored) => {
                self.breaker.record_success();
                Ok(stored)
            }
            Err(e) => {
                self.breaker.record_failure();
                self.counters.record_error();
                Err(LayerError::Backend(e))
            }
        }
    }

    /// Wrap and store a value only if the key is absent in this backend
    pub fn add_value(
        &self,
        key: &str,
        value: V,
        ttl: u64,
        dependency: Option<DependencyMetadata>,
    ) -> Result<bool, LayerError> {
        self.gate()?;
        let wrapped = WrappedValue::from_ttl(value, self.clock.now(), ttl, dependency);
        match self.backend.add(key, StoredEntry::Wrapped(wrapped), backend_ttl(ttl)) {
            Ok(stored) => {
                self.breaker.record_success();
                Ok(stored)
            }
            Err(e) => {
                self.breaker.record_failure();
                self.counters.record_error();
                Err(LayerError::Backend(e))
            }
        }
    }

    /// Remove the entry under `key`, reporting the backend's own boolean
    pub fn delete_value(&self, key: &str) -> Result<bool, LayerError> {
        self.gate()?;
        match self.backend.delete(key) {
            Ok(deleted) => {
                self.breaker.record_success();
                Ok(deleted)
            }
            Err(e) => {
                self.breaker.record_failure();
                self.counters.record_error();
                Err(LayerError::Backend(e))
            }
        }
    }

    /// Drop every entry in this layer's backend
    pub fn flush(&self) -> Result<bool, LayerError> {
        self.gate()?;
        match self.backend.flush() {
            Ok(flushed) => {
                self.breaker.record_success();
                Ok(flushed)
            }
            Err(e) => {
                self.breaker.record_failure();
                self.counters.record_error();
                Err(LayerError::Backend(e))
            }
        }
    }

    /// Count a malformed stored entry against this layer's breaker
    ///
    /// Used by the coordinator in strict mode when a read yields something
    /// that is not a wrapped value.
    pub(crate) fn record_format_failure(&self) {
        self.breaker.record_failure();
        self.counters.record_error();
    }

    /// Status record for the admin surface
    pub fn status(&self) -> LayerStatus {
        LayerStatus {
            index: self.index,
            backend: self.backend.kind().to_string(),
            breaker: self.breaker.kind().to_string(),
            state: self.breaker.state(),
            breaker_stats: self.breaker.stats(),
            statistics: self.counters.snapshot(),
        }
    }
}

impl<V> std::fmt::Debug for GuardedLayer<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedLayer")
            .field("index", &self.index)
            .field("backend", &self.backend.kind())
            .field("layer_ttl", &self.layer_ttl)
            .finish()
    }
}

/// TTL as handed to the backend: zero means "no expiry requested"
fn backend_ttl(ttl: u64) -> Option<u64> {
    if ttl > 0 { Some(ttl) } else { None }
}
