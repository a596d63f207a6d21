//! Strata prelude - convenient imports for users
//!
//! This module provides everything users need to assemble and operate a
//! tiered cache facade.

// Re-export the public API
pub use crate::strata::{Strata, StrataBuilder};

// Re-export configuration surface
pub use crate::cache::breaker::{BreakerState, CircuitBreakerConfig};
pub use crate::cache::config::{LayerConfig, RecoveryStrategy, StrataConfig, WriteStrategy};

// Re-export the collaborator traits users implement or inject
pub use crate::cache::backend::{BackendError, CacheBackend, MemoryBackend, StoredEntry};
pub use crate::cache::clock::{Clock, ManualClock, SystemClock};
pub use crate::cache::dependency::{
    Dependency, DependencyMetadata, DependencyRegistry, TagDependency, TagStore,
};

// Re-export the stored envelope and status types
pub use crate::cache::envelope::WrappedValue;
pub use crate::cache::types::error_types::CacheError;
pub use crate::cache::types::statistics::{BreakerStats, LayerStatistics, LayerStatus};

// Re-export serde traits that users' value types need to implement when
// a layer persists through the wire codec
pub use serde::{Deserialize, Serialize};
