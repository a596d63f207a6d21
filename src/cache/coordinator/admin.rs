//! Breaker admin surface
//!
//! Per-layer status reporting and manual breaker control. Forcing an
//! out-of-range layer index is a no-op rather than an error, so operator
//! tooling can probe freely.

use super::TieredCoordinator;
use crate::cache::types::statistics::LayerStatus;

impl<V> TieredCoordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Status of every layer in priority order
    pub fn layer_status(&self) -> Vec<LayerStatus> {
        self.layers().iter().map(|layer| layer.status()).collect()
    }

    /// Force the breaker of layer `index` open
    pub fn force_layer_open(&self, index: usize) {
        if let Some(layer) = self.layers().get(index) {
            layer.breaker().force_open();
            log::info!("layer {} circuit forced open", index);
        }
    }

    /// Force the breaker of layer `index` closed
    pub fn force_layer_close(&self, index: usize) {
        if let Some(layer) = self.layers().get(index) {
            layer.breaker().force_close();
            log::info!("layer {} circuit forced closed", index);
        }
    }

    /// Return every layer's breaker to an empty closed state
    pub fn reset_circuit_breakers(&self) {
        for layer in self.layers() {
            layer.breaker().reset();
        }
        log::info!("all layer circuits reset");
    }
}
