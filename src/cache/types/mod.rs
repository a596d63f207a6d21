//! Shared types for the tiered cache facade
//!
//! Facade-level error types and the statistics snapshots surfaced by the
//! admin API live here; everything else is defined next to the component
//! that owns it.

pub mod error_types;
pub mod statistics;

pub use error_types::CacheError;
pub use statistics::{BreakerStats, LayerCounters, LayerStatistics, LayerStatus};
