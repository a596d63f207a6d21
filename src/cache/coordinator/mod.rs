//! Tiered coordinator
//!
//! Orchestrates the priority-ordered layer stack behind a single key/value
//! surface: the read cascade with optional recovery populate, the
//! write-propagation strategies, delete/flush fan-out, and the breaker
//! admin operations.
//!
//! The coordinator is shared by parallel callers. Everything here is
//! immutable after construction except the per-layer breaker runtimes and
//! counters, which synchronize themselves; the only blocking points are
//! the backend calls.

pub mod admin;
pub mod read_path;
pub mod write_path;

use std::sync::Arc;

use crate::cache::breaker::CircuitBreaker;
use crate::cache::clock::Clock;
use crate::cache::config::{LayerConfig, RecoveryStrategy, StrataConfig, WriteStrategy};
use crate::cache::dependency::DependencyRegistry;
use crate::cache::layer::GuardedLayer;
use crate::cache::types::error_types::CacheError;

/// Coordinator over a fixed stack of guarded layers
pub struct TieredCoordinator<V> {
    layers: Vec<GuardedLayer<V>>,
    write_strategy: WriteStrategy,
    recovery_strategy: RecoveryStrategy,
    strict_mode: bool,
    registry: Arc<DependencyRegistry>,
    clock: Arc<dyn Clock>,
}

impl<V> TieredCoordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Build a coordinator; refuses configurations it could not run with
    pub fn new(
        layer_configs: Vec<LayerConfig<V>>,
        config: StrataConfig,
        registry: Arc<DependencyRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        if layer_configs.is_empty() {
            return Err(CacheError::InvalidConfiguration(
                "layer list is empty; at least one layer is required".to_string(),
            ));
        }
        config.validate()?;

        let mut layers = Vec::with_capacity(layer_configs.len());
        for (index, layer_config) in layer_configs.into_iter().enumerate() {
            layer_config.validate()?;
            let breaker_config = layer_config.breaker.unwrap_or(config.default_breaker);
            let breaker = CircuitBreaker::new(breaker_config, clock.clone());
            layers.push(GuardedLayer::new(
                index,
                layer_config.backend,
                breaker,
                layer_config.ttl,
                clock.clone(),
            ));
        }

        Ok(Self {
            layers,
            write_strategy: config.write_strategy,
            recovery_strategy: config.recovery_strategy,
            strict_mode: config.strict_mode,
            registry,
            clock,
        })
    }

    /// Number of layers in the stack
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn write_strategy(&self) -> WriteStrategy {
        self.write_strategy
    }

    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        self.recovery_strategy
    }

    pub fn strict_mode(&self) -> bool {
        self.strict_mode
    }

    pub(crate) fn layers(&self) -> &[GuardedLayer<V>] {
        &self.layers
    }

    pub(crate) fn registry(&self) -> &DependencyRegistry {
        &self.registry
    }

    pub(crate) fn now(&self) -> u64 {
        self.clock.now()
    }
}

impl<V> std::fmt::Debug for TieredCoordinator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCoordinator")
            .field("layers", &self.layers)
            .field("write_strategy", &self.write_strategy)
            .field("recovery_strategy", &self.recovery_strategy)
            .field("strict_mode", &self.strict_mode)
            .finish()
    }
}
