//! Read cascade and recovery populate
//!
//! A read walks the layer stack in priority order until a usable entry
//! turns up. Failed or gated layers are skipped, expired entries count as
//! misses, and legacy raw entries are either auto-wrapped or rejected
//! depending on strict mode. A deeper-tier hit can back-fill the healthy
//! layers above it with the remaining lifetime of the value.

use super::TieredCoordinator;
use crate::cache::backend::StoredEntry;
use crate::cache::breaker::BreakerState;
use crate::cache::config::RecoveryStrategy;
use crate::cache::envelope::WrappedValue;
use crate::cache::layer::LayerError;

/// Successful cascade outcome: the entry and the layer that produced it
#[derive(Debug)]
struct CascadeHit<V> {
    layer_index: usize,
    wrapped: WrappedValue<V>,
}

impl<V> TieredCoordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Read `key` through the layer stack
    ///
    /// Returns the value of the first non-expired hit whose dependency
    /// (if any) is still unchanged; `None` when every layer missed or
    /// failed, or the hit's dependency reports a changed world.
    pub fn get(&self, key: &str) -> Option<V> {
        let hit = self.cascade(key)?;

        if hit.layer_index > 0 && self.recovery_strategy() == RecoveryStrategy::Populate {
            self.populate_upper(key, &hit);
        }

        let (value, dependency) = hit.wrapped.into_parts();
        if let Some(meta) = dependency {
            match meta.recreate(self.registry()) {
                Ok(dependency) => {
                    if dependency.is_changed() {
                        log::debug!(
                            "dependency {} changed, treating {:?} as miss",
                            meta.class_name(),
                            key
                        );
                        return None;
                    }
                }
                Err(e) => {
                    log::warn!(
                        "cannot recreate dependency for {:?}, treating as miss: {}",
                        key,
                        e
                    );
                    return None;
                }
            }
        }
        Some(value)
    }

    /// Walk the layers in index order until one yields a usable entry
    fn cascade(&self, key: &str) -> Option<CascadeHit<V>> {
        let now = self.now();
        for layer in self.layers() {
            let entry = match layer.get_value(key) {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(LayerError::Unavailable) => {
                    log::debug!("layer {} circuit open, skipping read", layer.index());
                    continue;
                }
                Err(LayerError::Backend(e)) => {
                    log::warn!("layer {} read failed: {}", layer.index(), e);
                    continue;
                }
            };

            let wrapped = match entry {
                StoredEntry::Wrapped(wrapped) => wrapped,
                StoredEntry::Raw(value) => {
                    if self.strict_mode() {
                        log::warn!(
                            "layer {} returned a non-wrapped entry in strict mode",
                            layer.index()
                        );
                        layer.record_format_failure();
                        continue;
                    }
                    // Compatibility mode: adopt the legacy value as-is
                    WrappedValue::new(value, None, None)
                }
            };

            if wrapped.is_expired(now) {
                // Treat as a miss for this layer; the backend's own TTL
                // or eviction reclaims the entry
                continue;
            }

            return Some(CascadeHit {
                layer_index: layer.index(),
                wrapped,
            });
        }
        None
    }

    /// Back-fill layers above the hit layer with the remaining lifetime
    ///
    /// Only layers whose breaker is currently closed are populated; a
    /// half-open circuit's probe slot stays reserved for caller traffic.
    fn populate_upper(&self, key: &str, hit: &CascadeHit<V>) {
        let now = self.now();
        for layer in &self.layers()[..hit.layer_index] {
            if layer.breaker().state() != BreakerState::Closed {
                log::debug!(
                    "layer {} breaker not closed, skipping populate",
                    layer.index()
                );
                continue;
            }
            let ttl = backfill_ttl(hit.wrapped.expires_at(), layer.layer_ttl(), now);
            let dependency = hit.wrapped.dependency().cloned();
            match layer.set_value(key, hit.wrapped.value().clone(), ttl, dependency) {
                Ok(_) => {}
                Err(e) => {
                    log::warn!("populate of layer {} failed: {}", layer.index(), e);
                }
            }
        }
    }
}

/// TTL for back-filling a value into a higher layer
///
/// A source without facade expiry inherits the destination's ceiling (or
/// no expiry at all). Otherwise the remaining lifetime is clamped to the
/// ceiling, with a floor of one second so a value observed alive is not
/// written pre-expired under one second of clock skew.
pub(crate) fn backfill_ttl(expires_at: Option<u64>, layer_ttl: Option<u64>, now: u64) -> u64 {
    match expires_at {
        None => layer_ttl.unwrap_or(0),
        Some(at) => {
            let mut remaining = at.saturating_sub(now).max(1);
            if let Some(ceiling) = layer_ttl {
                if ceiling > 0 {
                    remaining = remaining.min(ceiling);
                }
            }
            remaining
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::backend::{CacheBackend, MemoryBackend, StoredEntry};
    use crate::cache::clock::ManualClock;
    use crate::cache::config::{LayerConfig, StrataConfig};
    use crate::cache::dependency::{Dependency, DependencyRegistry, TagDependency, TagStore};
    use crate::cache::testing::{CountingBackend, FailingBackend};

    struct Fixture {
        backends: Vec<Arc<MemoryBackend<String>>>,
        clock: Arc<ManualClock>,
        store: Arc<TagStore>,
    }

    impl Fixture {
        fn coordinator(&self, config: StrataConfig) -> TieredCoordinator<String> {
            self.coordinator_with_ttls(config, vec![None; self.backends.len()])
        }

        fn coordinator_with_ttls(
            &self,
            config: StrataConfig,
            ttls: Vec<Option<u64>>,
        ) -> TieredCoordinator<String> {
            let mut registry = DependencyRegistry::new();
            TagDependency::register(self.store.clone(), &mut registry);
            let layers = self
                .backends
                .iter()
                .zip(ttls)
                .map(|(backend, ttl)| {
                    let backend: Arc<dyn CacheBackend<String>> = backend.clone();
                    let mut layer = LayerConfig::new(backend);
                    if let Some(ttl) = ttl {
                        layer = layer.with_ttl(ttl);
                    }
                    layer
                })
                .collect();
            TieredCoordinator::new(layers, config, Arc::new(registry), self.clock.clone()).unwrap()
        }
    }

    fn fixture(layer_count: usize) -> Fixture {
        let clock = Arc::new(ManualClock::new(1_000));
        let backends = (0..layer_count)
            .map(|_| Arc::new(MemoryBackend::with_clock(clock.clone())))
            .collect();
        Fixture {
            backends,
            clock,
            store: Arc::new(TagStore::new()),
        }
    }

    #[test]
    fn test_round_trip() {
        let fixture = fixture(3);
        let coordinator = fixture.coordinator(StrataConfig::default());

        assert!(coordinator.set("a", "v".to_string(), 60));
        assert_eq!(coordinator.get("a"), Some("v".to_string()));
    }

    #[test]
    fn test_hit_comes_from_first_holding_layer() {
        let fixture = fixture(2);
        let coordinator = fixture.coordinator(StrataConfig::default());

        coordinator.set("k", "both".to_string(), 60);
        // Overwrite only the deeper layer directly
        fixture.backends[1]
            .set("k", StoredEntry::Raw("deep".to_string()), None)
            .unwrap();
        assert_eq!(coordinator.get("k"), Some("both".to_string()));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let fixture = fixture(1);
        let coordinator = fixture.coordinator(StrataConfig::default());

        coordinator.set("k", "v".to_string(), 10);
        fixture.clock.advance(10);
        assert_eq!(coordinator.get("k"), None);
    }

    #[test]
    fn test_compat_mode_adopts_raw_entries() {
        let fixture = fixture(1);
        let coordinator = fixture.coordinator(StrataConfig::default());

        // Written by an external writer sharing the backend
        fixture.backends[0]
            .set("k", StoredEntry::Raw("legacy".to_string()), None)
            .unwrap();
        assert_eq!(coordinator.get("k"), Some("legacy".to_string()));
    }

    #[test]
    fn test_strict_mode_rejects_raw_entries() {
        let fixture = fixture(1);
        let config = StrataConfig {
            strict_mode: true,
            ..StrataConfig::default()
        };
        let coordinator = fixture.coordinator(config);

        fixture.backends[0]
            .set("k", StoredEntry::Raw("legacy".to_string()), None)
            .unwrap();
        assert_eq!(coordinator.get("k"), None);
        // The malformed read counted against the layer's breaker
        assert_eq!(coordinator.layer_status()[0].breaker_stats.failures, 1);
    }

    #[test]
    fn test_recovery_populate_refills_upper_layers() {
        let fixture = fixture(3);
        let config = StrataConfig {
            recovery_strategy: RecoveryStrategy::Populate,
            ..StrataConfig::default()
        };
        let coordinator = fixture.coordinator(config);

        coordinator.set("k", "v2".to_string(), 60);
        fixture.backends[0].delete("k").unwrap();
        fixture.backends[1].delete("k").unwrap();

        assert_eq!(coordinator.get("k"), Some("v2".to_string()));

        for backend in &fixture.backends[..2] {
            match backend.get("k").unwrap() {
                Some(StoredEntry::Wrapped(wrapped)) => {
                    assert_eq!(wrapped.value(), "v2");
                    let at = wrapped.expires_at().unwrap();
                    assert!(at > 1_000 && at <= 1_060);
                }
                other => panic!("expected populated wrapped entry, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_natural_recovery_leaves_upper_layers_empty() {
        let fixture = fixture(2);
        let coordinator = fixture.coordinator(StrataConfig::default());

        coordinator.set("k", "v".to_string(), 60);
        fixture.backends[0].delete("k").unwrap();

        assert_eq!(coordinator.get("k"), Some("v".to_string()));
        assert_eq!(fixture.backends[0].get("k").unwrap(), None);
    }

    #[test]
    fn test_populate_skips_non_closed_breakers() {
        let fixture = fixture(2);
        let config = StrataConfig {
            recovery_strategy: RecoveryStrategy::Populate,
            ..StrataConfig::default()
        };
        let coordinator = fixture.coordinator(config);

        coordinator.set("k", "v".to_string(), 60);
        fixture.backends[0].delete("k").unwrap();
        coordinator.force_layer_open(0);

        assert_eq!(coordinator.get("k"), Some("v".to_string()));
        // The open layer was left alone
        coordinator.force_layer_close(0);
        assert_eq!(fixture.backends[0].get("k").unwrap(), None);
    }

    #[test]
    fn test_failing_layer_opens_and_gets_skipped() {
        let clock = Arc::new(ManualClock::new(1_000));
        let l1 = Arc::new(MemoryBackend::with_clock(clock.clone()));
        let l2 = Arc::new(FailingBackend::new());

        let mut registry = DependencyRegistry::new();
        TagDependency::register(Arc::new(TagStore::new()), &mut registry);
        let coordinator: TieredCoordinator<String> = TieredCoordinator::new(
            vec![
                LayerConfig::new(l1.clone() as Arc<dyn CacheBackend<String>>),
                LayerConfig::new(l2.clone() as Arc<dyn CacheBackend<String>>),
            ],
            StrataConfig::default(),
            Arc::new(registry),
            clock,
        )
        .unwrap();

        // Ten misses fill the failing layer's breaker window
        for _ in 0..10 {
            assert_eq!(coordinator.get("k"), None);
        }
        assert_eq!(l2.calls(), 10);

        // The eleventh read no longer reaches the failing backend
        assert_eq!(coordinator.get("k"), None);
        assert_eq!(l2.calls(), 10);
    }

    #[test]
    fn test_dependency_invalidation() {
        let fixture = fixture(2);
        let coordinator = fixture.coordinator(StrataConfig::default());

        let users = TagDependency::new(fixture.store.clone(), ["users"]);
        let orders = TagDependency::new(fixture.store.clone(), ["orders"]);
        assert!(coordinator.set_with_dependency("u1", "alice".to_string(), 3_600, &users));
        assert!(coordinator.set_with_dependency("u2", "bob".to_string(), 3_600, &users));
        assert!(coordinator.set_with_dependency("o1", "order".to_string(), 3_600, &orders));

        fixture.store.invalidate("users");

        assert_eq!(coordinator.get("u1"), None);
        assert_eq!(coordinator.get("u2"), None);
        assert_eq!(coordinator.get("o1"), Some("order".to_string()));
    }

    #[test]
    fn test_unknown_dependency_class_is_a_miss() {
        let fixture = fixture(1);
        let coordinator = fixture.coordinator(StrataConfig::default());

        // A dependency class no registry entry exists for
        let store = Arc::new(TagStore::new());
        let foreign = TagDependency::new(store, ["x"]);
        let meta = crate::cache::dependency::DependencyMetadata::new(
            "unregistered",
            foreign.config(),
            foreign.evaluated_data(),
        );
        fixture.backends[0]
            .set(
                "k",
                StoredEntry::Wrapped(WrappedValue::new("v".to_string(), None, Some(meta))),
                None,
            )
            .unwrap();

        assert_eq!(coordinator.get("k"), None);
    }

    #[test]
    fn test_counting_backend_untouched_when_forced_open() {
        let clock = Arc::new(ManualClock::new(1_000));
        let counting = Arc::new(CountingBackend::with_clock(clock.clone()));
        let mut registry = DependencyRegistry::new();
        TagDependency::register(Arc::new(TagStore::new()), &mut registry);
        let coordinator: TieredCoordinator<String> = TieredCoordinator::new(
            vec![LayerConfig::new(
                counting.clone() as Arc<dyn CacheBackend<String>>
            )],
            StrataConfig::default(),
            Arc::new(registry),
            clock,
        )
        .unwrap();

        coordinator.force_layer_open(0);
        assert_eq!(coordinator.get("k"), None);
        assert!(!coordinator.set("k", "v".to_string(), 10));
        assert_eq!(counting.calls(), 0);
    }

    #[test]
    fn test_ttl_ceiling_clamps_and_expires() {
        let fixture = fixture(1);
        let coordinator =
            fixture.coordinator_with_ttls(StrataConfig::default(), vec![Some(2)]);

        coordinator.set("k", "v".to_string(), 3_600);
        match fixture.backends[0].get("k").unwrap() {
            Some(StoredEntry::Wrapped(wrapped)) => {
                assert!(wrapped.expires_at().unwrap() <= 1_002);
            }
            other => panic!("expected wrapped entry, got {:?}", other),
        }

        fixture.clock.advance(3);
        assert_eq!(coordinator.get("k"), None);
    }

    #[test]
    fn test_backfill_ttl_rules() {
        // No source expiry: inherit the destination ceiling, or none
        assert_eq!(backfill_ttl(None, None, 1_000), 0);
        assert_eq!(backfill_ttl(None, Some(30), 1_000), 30);

        // Remaining lifetime, clamped to the ceiling
        assert_eq!(backfill_ttl(Some(1_060), None, 1_000), 60);
        assert_eq!(backfill_ttl(Some(1_060), Some(30), 1_000), 30);
        assert_eq!(backfill_ttl(Some(1_020), Some(30), 1_000), 20);

        // Floor of one second against clock skew
        assert_eq!(backfill_ttl(Some(1_000), None, 1_000), 1);
        assert_eq!(backfill_ttl(Some(990), None, 1_000), 1);
    }
}
