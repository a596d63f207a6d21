//! Statistics snapshots for layers and breakers
//!
//! This module provides the per-layer observability types returned by the
//! coordinator's status surface: breaker window statistics, backend access
//! counters, and the combined per-layer status record.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::breaker::BreakerState;

/// Snapshot of a breaker's sliding outcome window
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BreakerStats {
    /// Outcomes currently held in the window
    pub total: usize,
    /// Failed outcomes in the window
    pub failures: usize,
    /// `failures / total`, `0.0` for an empty window
    pub failure_rate: f64,
}

impl BreakerStats {
    /// Build a snapshot from raw window counts
    pub fn from_counts(total: usize, failures: usize) -> Self {
        let failure_rate = if total > 0 {
            failures as f64 / total as f64
        } else {
            0.0
        };
        Self {
            total,
            failures,
            failure_rate,
        }
    }
}

/// Atomic per-layer access counters
///
/// Counts backend-level outcomes: a hit is any entry returned by the
/// backend (expiry interpretation happens above, in the coordinator),
/// a miss is an empty read, an error is any failed backend call.
#[derive(Debug, Default)]
pub struct LayerCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl LayerCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent-enough snapshot of the counters
    pub fn snapshot(&self) -> LayerStatistics {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        LayerStatistics::from_counts(hits, misses, errors)
    }
}

/// Point-in-time per-layer access statistics
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerStatistics {
    /// Reads that returned an entry
    pub hits: u64,
    /// Reads that returned nothing
    pub misses: u64,
    /// Failed backend calls
    pub errors: u64,
    /// `hits / (hits + misses)`, `0.0` when no reads completed
    pub hit_rate: f64,
}

impl LayerStatistics {
    /// Build a snapshot from raw counters
    pub fn from_counts(hits: u64, misses: u64, errors: u64) -> Self {
        let reads = hits + misses;
        let hit_rate = if reads > 0 {
            hits as f64 / reads as f64
        } else {
            0.0
        };
        Self {
            hits,
            misses,
            errors,
            hit_rate,
        }
    }
}

/// Combined status record for one layer, as returned by the admin surface
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LayerStatus {
    /// Position in the priority-ordered layer stack (0 = highest)
    pub index: usize,
    /// Backend class identifier
    pub backend: String,
    /// Breaker class identifier
    pub breaker: String,
    /// Current breaker state (timeout transition already applied)
    pub state: BreakerState,
    /// Breaker window statistics
    pub breaker_stats: BreakerStats,
    /// Backend access statistics
    pub statistics: LayerStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_stats_rate() {
        let stats = BreakerStats::from_counts(10, 4);
        assert_eq!(stats.total, 10);
        assert_eq!(stats.failures, 4);
        assert!((stats.failure_rate - 0.4).abs() < f64::EPSILON);

        // Empty window reports a zero rate, not NaN
        let empty = BreakerStats::from_counts(0, 0);
        assert_eq!(empty.failure_rate, 0.0);
    }

    #[test]
    fn test_layer_counters_snapshot() {
        let counters = LayerCounters::new();
        for _ in 0..3 {
            counters.record_hit();
        }
        counters.record_miss();
        counters.record_error();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.hits, 3);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.errors, 1);
        assert!((snapshot.hit_rate - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_rate_without_reads() {
        let stats = LayerStatistics::from_counts(0, 0, 5);
        assert_eq!(stats.hit_rate, 0.0);
    }
}
