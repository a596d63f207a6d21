//! Write propagation, delete, and flush
//!
//! Writes extract the optional dependency into metadata, clamp the
//! requested TTL against each layer's ceiling, and fan out according to
//! the write strategy. Delete and flush always fan out to every layer and
//! succeed if any layer did; per-layer errors never abort the fan-out.

use super::TieredCoordinator;
use crate::cache::dependency::{Dependency, DependencyMetadata};
use crate::cache::config::WriteStrategy;
use crate::cache::layer::LayerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOp {
    Set,
    Add,
}

impl<V> TieredCoordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Store `value` under `key` with a requested TTL in seconds
    ///
    /// A zero TTL stores without facade expiry. Returns whether any layer
    /// accepted the write.
    pub fn set(&self, key: &str, value: V, ttl: u64) -> bool {
        self.write(key, value, ttl, None, WriteOp::Set)
    }

    /// Store `value` with a dependency snapshot captured at write time
    pub fn set_with_dependency(
        &self,
        key: &str,
        value: V,
        ttl: u64,
        dependency: &dyn Dependency,
    ) -> bool {
        let meta = DependencyMetadata::from_dependency(dependency);
        self.write(key, value, ttl, Some(meta), WriteOp::Set)
    }

    /// Store `value` only in layers where `key` is absent
    pub fn add(&self, key: &str, value: V, ttl: u64) -> bool {
        self.write(key, value, ttl, None, WriteOp::Add)
    }

    /// `add` with a dependency snapshot captured at write time
    pub fn add_with_dependency(
        &self,
        key: &str,
        value: V,
        ttl: u64,
        dependency: &dyn Dependency,
    ) -> bool {
        let meta = DependencyMetadata::from_dependency(dependency);
        self.write(key, value, ttl, Some(meta), WriteOp::Add)
    }

    fn write(
        &self,
        key: &str,
        value: V,
        ttl: u64,
        meta: Option<DependencyMetadata>,
        op: WriteOp,
    ) -> bool {
        let mut any_succeeded = false;
        for layer in self.layers() {
            let ttl = effective_ttl(ttl, layer.layer_ttl());
            let result = match op {
                WriteOp::Set => layer.set_value(key, value.clone(), ttl, meta.clone()),
                WriteOp::Add => layer.add_value(key, value.clone(), ttl, meta.clone()),
            };
            match result {
                Ok(true) => {
                    any_succeeded = true;
                    if self.write_strategy() == WriteStrategy::First {
                        return true;
                    }
                }
                Ok(false) => {}
                Err(LayerError::Unavailable) => {
                    log::debug!("layer {} circuit open, skipping write", layer.index());
                }
                Err(LayerError::Backend(e)) => {
                    log::warn!("layer {} write failed: {}", layer.index(), e);
                }
            }
        }
        any_succeeded
    }

    /// Remove `key` from every layer; true if any layer removed it
    ///
    /// The fan-out ignores the write strategy.
    pub fn delete(&self, key: &str) -> bool {
        let mut any_succeeded = false;
        for layer in self.layers() {
            match layer.delete_value(key) {
                Ok(deleted) => any_succeeded = any_succeeded || deleted,
                Err(LayerError::Unavailable) => {
                    log::debug!("layer {} circuit open, skipping delete", layer.index());
                }
                Err(LayerError::Backend(e)) => {
                    log::warn!("layer {} delete failed: {}", layer.index(), e);
                }
            }
        }
        any_succeeded
    }

    /// Drop every entry in every layer; true if any layer flushed
    pub fn flush(&self) -> bool {
        let mut any_succeeded = false;
        for layer in self.layers() {
            match layer.flush() {
                Ok(flushed) => any_succeeded = any_succeeded || flushed,
                Err(LayerError::Unavailable) => {
                    log::debug!("layer {} circuit open, skipping flush", layer.index());
                }
                Err(LayerError::Backend(e)) => {
                    log::warn!("layer {} flush failed: {}", layer.index(), e);
                }
            }
        }
        any_succeeded
    }
}

/// Requested TTL clamped against a layer's ceiling
///
/// Zero means "no expiry requested", so the ceiling alone applies when
/// one is configured.
pub(crate) fn effective_ttl(requested: u64, layer_ttl: Option<u64>) -> u64 {
    match layer_ttl {
        Some(ceiling) if ceiling > 0 => {
            if requested > 0 {
                requested.min(ceiling)
            } else {
                ceiling
            }
        }
        _ => requested,
    }
}
