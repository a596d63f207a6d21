//! Backend driver contract
//!
//! A backend is one storage tier: a process-local map, a shared network
//! cache, or a durable store. The facade never inspects what a backend does
//! with an entry beyond the capability set defined here; eviction and
//! enforcement of the passed TTL are the backend's business.

pub mod memory;

use crate::cache::envelope::WrappedValue;
pub use memory::MemoryBackend;

/// Entry as persisted by a backend
///
/// Backends shared with external writers may hold raw legacy values next
/// to facade-written envelopes; the `Raw` variant keeps those readable in
/// compatibility mode.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StoredEntry<V> {
    /// Envelope written through the facade
    Wrapped(WrappedValue<V>),
    /// Legacy value written directly by an external writer
    Raw(V),
}

/// Backend driver failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// I/O failure talking to the store
    Io(String),
    /// The backend's own request deadline elapsed
    Timeout,
    /// The backend refused the request
    Unavailable(String),
    /// Any other driver-reported failure
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Io(msg) => write!(f, "Backend I/O error: {}", msg),
            BackendError::Timeout => write!(f, "Backend request timed out"),
            BackendError::Unavailable(msg) => write!(f, "Backend unavailable: {}", msg),
            BackendError::Other(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Capability set every storage tier implements
///
/// All calls are synchronous and blocking; a networked driver applies its
/// own request timeout and surfaces the overrun as an error. The `ttl`
/// argument is in seconds and already clamped by the coordinator; `None`
/// asks the backend to keep the entry until evicted.
pub trait CacheBackend<V>: Send + Sync {
    /// Backend class identifier for the status surface
    fn kind(&self) -> &'static str;

    /// Fetch the entry stored under `key`
    fn get(&self, key: &str) -> Result<Option<StoredEntry<V>>, BackendError>;

    /// Store `entry` under `key`, replacing any existing entry
    fn set(&self, key: &str, entry: StoredEntry<V>, ttl: Option<u64>) -> Result<bool, BackendError>;

    /// Store `entry` under `key` only if the key is absent
    fn add(&self, key: &str, entry: StoredEntry<V>, ttl: Option<u64>) -> Result<bool, BackendError>;

    /// Remove the entry under `key`; reports whether the key was present
    fn delete(&self, key: &str) -> Result<bool, BackendError>;

    /// Drop every entry in this backend
    fn flush(&self) -> Result<bool, BackendError>;
}
