//! Backend doubles shared by the unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::backend::{BackendError, CacheBackend, MemoryBackend, StoredEntry};
use super::clock::Clock;

/// Backend that fails every call and counts how often it was reached
#[derive(Debug, Default)]
pub struct FailingBackend {
    calls: AtomicUsize,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls that reached this backend
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Io("injected failure".to_string()))
    }
}

impl<V> CacheBackend<V> for FailingBackend
where
    V: Clone + Send + Sync + 'static,
{
    fn kind(&self) -> &'static str {
        "failing"
    }

    fn get(&self, _key: &str) -> Result<Option<StoredEntry<V>>, BackendError> {
        self.fail()
    }

    fn set(&self, _key: &str, _entry: StoredEntry<V>, _ttl: Option<u64>) -> Result<bool, BackendError> {
        self.fail()
    }

    fn add(&self, _key: &str, _entry: StoredEntry<V>, _ttl: Option<u64>) -> Result<bool, BackendError> {
        self.fail()
    }

    fn delete(&self, _key: &str) -> Result<bool, BackendError> {
        self.fail()
    }

    fn flush(&self) -> Result<bool, BackendError> {
        self.fail()
    }
}

/// Memory backend that counts calls, for asserting a tier was skipped
#[derive(Debug)]
pub struct CountingBackend<V> {
    inner: MemoryBackend<V>,
    calls: AtomicUsize,
}

impl<V> CountingBackend<V> {
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: MemoryBackend::with_clock(clock),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl<V> CacheBackend<V> for CountingBackend<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn kind(&self) -> &'static str {
        "counting"
    }

    fn get(&self, key: &str) -> Result<Option<StoredEntry<V>>, BackendError> {
        self.count();
        self.inner.get(key)
    }

    fn set(&self, key: &str, entry: StoredEntry<V>, ttl: Option<u64>) -> Result<bool, BackendError> {
        self.count();
        self.inner.set(key, entry, ttl)
    }

    fn add(&self, key: &str, entry: StoredEntry<V>, ttl: Option<u64>) -> Result<bool, BackendError> {
        self.count();
        self.inner.add(key, entry, ttl)
    }

    fn delete(&self, key: &str) -> Result<bool, BackendError> {
        self.count();
        self.inner.delete(key)
    }

    fn flush(&self) -> Result<bool, BackendError> {
        self.count();
        self.inner.flush()
    }
}
