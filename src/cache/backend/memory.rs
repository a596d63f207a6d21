//! In-process memory backend
//!
//! Concurrent map-backed tier for the top of the stack and for tests.
//! TTL is enforced lazily: expired entries are dropped when a read or an
//! `add` observes them, not by a background sweeper.

use std::sync::Arc;

use dashmap::DashMap;

use super::{BackendError, CacheBackend, StoredEntry};
use crate::cache::clock::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct MemoryEntry<V> {
    entry: StoredEntry<V>,
    expires_at: Option<u64>,
}

impl<V> MemoryEntry<V> {
    fn is_expired(&self, now: u64) -> bool {
        match self.expires_at {
            Some(at) => now >= at,
            None => false,
        }
    }
}

/// DashMap-backed storage tier
#[derive(Debug)]
pub struct MemoryBackend<V> {
    entries: DashMap<String, MemoryEntry<V>>,
    clock: Arc<dyn Clock>,
}

impl<V> MemoryBackend<V> {
    /// Create a backend on the system wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a backend on an injected clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Live entries currently held (expired ones may still be counted)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for MemoryBackend<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheBackend<V> for MemoryBackend<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<StoredEntry<V>>, BackendError> {
        let now = self.clock.now();
        if let Some(found) = self.entries.get(key) {
            if found.is_expired(now) {
                drop(found);
                self.entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(found.entry.clone()));
        }
        Ok(None)
    }

    fn set(&self, key: &str, entry: StoredEntry<V>, ttl: Option<u64>) -> Result<bool, BackendError> {
        let expires_at = ttl.map(|secs| self.clock.now() + secs);
        self.entries
            .insert(key.to_string(), MemoryEntry { entry, expires_at });
        Ok(true)
    }

    fn add(&self, key: &str, entry: StoredEntry<V>, ttl: Option<u64>) -> Result<bool, BackendError> {
        let now = self.clock.now();
        let expires_at = ttl.map(|secs| now + secs);
        match self.entries.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(MemoryEntry { entry, expires_at });
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(MemoryEntry { entry, expires_at });
                Ok(true)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn flush(&self) -> Result<bool, BackendError> {
        self.entries.clear();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::envelope::WrappedValue;

    fn raw(value: &str) -> StoredEntry<String> {
        StoredEntry::Raw(value.to_string())
    }

    #[test]
    fn test_set_get_delete() {
        let backend: MemoryBackend<String> = MemoryBackend::new();
        assert!(backend.set("k", raw("v"), None).unwrap());
        assert_eq!(backend.get("k").unwrap(), Some(raw("v")));

        assert!(backend.delete("k").unwrap());
        assert!(!backend.delete("k").unwrap());
        assert_eq!(backend.get("k").unwrap(), None);
    }

    #[test]
    fn test_add_respects_existing_entry() {
        let backend: MemoryBackend<String> = MemoryBackend::new();
        assert!(backend.add("k", raw("first"), None).unwrap());
        assert!(!backend.add("k", raw("second"), None).unwrap());
        assert_eq!(backend.get("k").unwrap(), Some(raw("first")));
    }

    #[test]
    fn test_ttl_expires_lazily() {
        let clock = Arc::new(ManualClock::new(1_000));
        let backend: MemoryBackend<String> = MemoryBackend::with_clock(clock.clone());

        backend.set("k", raw("v"), Some(10)).unwrap();
        assert!(backend.get("k").unwrap().is_some());

        clock.advance(10);
        assert_eq!(backend.get("k").unwrap(), None);
        // The expired entry was dropped on read
        assert!(backend.is_empty());
    }

    #[test]
    fn test_add_overwrites_expired_entry() {
        let clock = Arc::new(ManualClock::new(1_000));
        let backend: MemoryBackend<String> = MemoryBackend::with_clock(clock.clone());

        backend.set("k", raw("old"), Some(5)).unwrap();
        clock.advance(5);
        assert!(backend.add("k", raw("new"), None).unwrap());
        assert_eq!(backend.get("k").unwrap(), Some(raw("new")));
    }

    #[test]
    fn test_flush_clears_everything() {
        let backend: MemoryBackend<String> = MemoryBackend::new();
        backend.set("a", raw("1"), None).unwrap();
        backend
            .set(
                "b",
                StoredEntry::Wrapped(WrappedValue::from_ttl("2".to_string(), 1_000, 60, None)),
                Some(60),
            )
            .unwrap();

        assert!(backend.flush().unwrap());
        assert!(backend.is_empty());
    }
}
