//! Public facade for the tiered cache
//!
//! `Strata` presents the whole layer stack as one key/value cache and is
//! the type applications hold on to. `StrataBuilder` assembles the layer
//! stack, strategies, dependency registry, and clock, and validates the
//! result before anything is constructed.

use std::sync::Arc;

use crate::cache::backend::CacheBackend;
use crate::cache::breaker::CircuitBreakerConfig;
use crate::cache::clock::{Clock, SystemClock};
use crate::cache::config::{LayerConfig, RecoveryStrategy, StrataConfig, WriteStrategy};
use crate::cache::coordinator::TieredCoordinator;
use crate::cache::dependency::{Dependency, DependencyRegistry};
use crate::cache::types::error_types::CacheError;
use crate::cache::types::statistics::LayerStatus;

/// Tiered cache facade over a priority-ordered stack of backends
///
/// Cheap to share: wrap it in an `Arc` and hand clones of that to every
/// caller. All operations are synchronous; the only blocking points are
/// the backend calls themselves, and an unhealthy backend is skipped once
/// its circuit opens.
pub struct Strata<V> {
    coordinator: TieredCoordinator<V>,
}

impl<V> Strata<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Start assembling a facade
    pub fn builder() -> StrataBuilder<V> {
        StrataBuilder::new()
    }

    /// Read `key`; `None` when every layer missed or failed, or the hit's
    /// dependency reports a changed world
    pub fn get(&self, key: &str) -> Option<V> {
        self.coordinator.get(key)
    }

    /// Store `value` for `ttl` seconds (0 = no facade expiry); true if
    /// any layer accepted the write
    pub fn set(&self, key: &str, value: V, ttl: u64) -> bool {
        self.coordinator.set(key, value, ttl)
    }

    /// `set` with a dependency snapshot captured at write time
    pub fn set_with_dependency(
        &self,
        key: &str,
        value: V,
        ttl: u64,
        dependency: &dyn Dependency,
    ) -> bool {
        self.coordinator.set_with_dependency(key, value, ttl, dependency)
    }

    /// Store `value` only in layers where `key` is absent
    pub fn add(&self, key: &str, value: V, ttl: u64) -> bool {
        self.coordinator.add(key, value, ttl)
    }

    /// `add` with a dependency snapshot captured at write time
    pub fn add_with_dependency(
        &self,
        key: &str,
        value: V,
        ttl: u64,
        dependency: &dyn Dependency,
    ) -> bool {
        self.coordinator.add_with_dependency(key, value, ttl, dependency)
    }

    /// Remove `key` from every layer
    pub fn delete(&self, key: &str) -> bool {
        self.coordinator.delete(key)
    }

    /// Drop every entry from every layer
    pub fn flush(&self) -> bool {
        self.coordinator.flush()
    }

    /// Per-layer breaker state and statistics
    pub fn layer_status(&self) -> Vec<LayerStatus> {
        self.coordinator.layer_status()
    }

    /// Force the breaker of layer `index` open; out of range is a no-op
    pub fn force_layer_open(&self, index: usize) {
        self.coordinator.force_layer_open(index)
    }

    /// Force the breaker of layer `index` closed; out of range is a no-op
    pub fn force_layer_close(&self, index: usize) {
        self.coordinator.force_layer_close(index)
    }

    /// Return every layer's breaker to an empty closed state
    pub fn reset_circuit_breakers(&self) {
        self.coordinator.reset_circuit_breakers()
    }

    /// Number of layers in the stack
    pub fn layer_count(&self) -> usize {
        self.coordinator.layer_count()
    }
}

impl<V> std::fmt::Debug for Strata<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strata")
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

/// Fluent assembly of a `Strata` facade
pub struct StrataBuilder<V> {
    layers: Vec<LayerConfig<V>>,
    config: StrataConfig,
    registry: DependencyRegistry,
    clock: Arc<dyn Clock>,
}

impl<V> StrataBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            config: StrataConfig::default(),
            registry: DependencyRegistry::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Append a layer with default TTL and breaker settings
    ///
    /// Layers are queried in the order they were added; the first one is
    /// the highest-priority tier.
    pub fn layer(self, backend: Arc<dyn CacheBackend<V>>) -> Self {
        self.layer_config(LayerConfig::new(backend))
    }

    /// Append a fully configured layer
    pub fn layer_config(mut self, layer: LayerConfig<V>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn write_strategy(mut self, strategy: WriteStrategy) -> Self {
        self.config.write_strategy = strategy;
        self
    }

    pub fn recovery_strategy(mut self, strategy: RecoveryStrategy) -> Self {
        self.config.recovery_strategy = strategy;
        self
    }

    pub fn strict_mode(mut self, strict: bool) -> Self {
        self.config.strict_mode = strict;
        self
    }

    /// Breaker settings applied to layers without their own override
    pub fn default_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.config.default_breaker = breaker;
        self
    }

    /// Replace the dependency registry wholesale
    pub fn dependency_registry(mut self, registry: DependencyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register one dependency factory on the builder's registry
    pub fn register_dependency<F>(mut self, class_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(
                &serde_json::Map<String, serde_json::Value>,
                serde_json::Value,
            ) -> Result<Box<dyn Dependency>, CacheError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register(class_name, factory);
        self
    }

    /// Inject a time source; tests use `ManualClock`
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the assembled configuration and construct the facade
    pub fn build(self) -> Result<Strata<V>, CacheError> {
        let coordinator = TieredCoordinator::new(
            self.layers,
            self.config,
            Arc::new(self.registry),
            self.clock,
        )?;
        Ok(Strata { coordinator })
    }
}

impl<V> Default for StrataBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
