//! Facade configuration
//!
//! Strategy enums, per-layer configuration, and the top-level facade
//! settings with their defaults. Everything here is fixed once the facade
//! is constructed; validation happens at build time and refuses to
//! construct a facade that could not operate.

use std::sync::Arc;

use crate::cache::backend::CacheBackend;
use crate::cache::breaker::CircuitBreakerConfig;
use crate::cache::types::error_types::CacheError;

/// How a write propagates across the layer stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WriteStrategy {
    /// Attempt every layer; succeed if any layer accepted
    #[serde(rename = "through")]
    Through,
    /// Stop at the first layer that accepts the write
    #[serde(rename = "first")]
    First,
}

impl Default for WriteStrategy {
    fn default() -> Self {
        Self::Through
    }
}

/// How upper layers recover after a deeper-tier hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RecoveryStrategy {
    /// Back-fill healthy higher layers with the value and remaining TTL
    #[serde(rename = "populate")]
    Populate,
    /// Let higher layers refill through ordinary writes
    #[serde(rename = "natural")]
    Natural,
}

impl Default for RecoveryStrategy {
    fn default() -> Self {
        Self::Natural
    }
}

/// Top-level facade settings
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrataConfig {
    pub write_strategy: WriteStrategy,
    pub recovery_strategy: RecoveryStrategy,
    /// Reject reads of entries that are not wrapped values instead of
    /// auto-wrapping them
    pub strict_mode: bool,
    /// Breaker settings applied to layers without their own override
    pub default_breaker: CircuitBreakerConfig,
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            write_strategy: WriteStrategy::default(),
            recovery_strategy: RecoveryStrategy::default(),
            strict_mode: false,
            default_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl StrataConfig {
    pub fn validate(&self) -> Result<(), CacheError> {
        self.default_breaker.validate()
    }
}

/// Configuration of one layer in the priority-ordered stack
pub struct LayerConfig<V> {
    pub backend: Arc<dyn CacheBackend<V>>,
    /// TTL ceiling in seconds for values stored in this layer
    pub ttl: Option<u64>,
    /// Breaker override; the facade default applies when absent
    pub breaker: Option<CircuitBreakerConfig>,
}

impl<V> LayerConfig<V> {
    pub fn new(backend: Arc<dyn CacheBackend<V>>) -> Self {
        Self {
            backend,
            ttl: None,
            breaker: None,
        }
    }

    /// Cap the lifetime of values stored in this layer
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Override the breaker settings for this layer
    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if let Some(breaker) = &self.breaker {
            breaker.validate()?;
        }
        Ok(())
    }
}

impl<V> Clone for LayerConfig<V> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            ttl: self.ttl,
            breaker: self.breaker,
        }
    }
}

impl<V> std::fmt::Debug for LayerConfig<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerConfig")
            .field("backend", &self.backend.kind())
            .field("ttl", &self.ttl)
            .field("breaker", &self.breaker)
            .finish()
    }
}
