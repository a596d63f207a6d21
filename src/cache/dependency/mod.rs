//! Dependency-based invalidation
//!
//! A dependency is a snapshot-comparing invalidation primitive: at write
//! time it captures an evaluated view of some external state, and at read
//! time `is_changed` compares that snapshot against the current world to
//! decide whether the cached entry is still valid.
//!
//! Concrete dependency types are registered by class identifier in a
//! `DependencyRegistry`, which lets `DependencyMetadata::recreate`
//! instantiate the right type from its serialized form.

pub mod metadata;
pub mod tag;

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::cache::types::error_types::CacheError;
pub use metadata::DependencyMetadata;
pub use tag::{TagDependency, TagStore};

/// Snapshot-comparing invalidation primitive
pub trait Dependency: Send + Sync {
    /// Class identifier under which this dependency variant is registered
    fn class_name(&self) -> &'static str;

    /// Public configuration fields, excluding the evaluated snapshot
    fn config(&self) -> Map<String, Value>;

    /// Snapshot captured when this dependency instance was created
    fn evaluated_data(&self) -> Value;

    /// Evaluate the current world state into a comparable snapshot
    fn evaluate(&self) -> Value;

    /// Whether the world has changed since the captured snapshot
    fn is_changed(&self) -> bool {
        self.evaluate() != self.evaluated_data()
    }
}

/// Factory recreating a dependency from its recorded config and snapshot
pub type DependencyFactory =
    Box<dyn Fn(&Map<String, Value>, Value) -> Result<Box<dyn Dependency>, CacheError> + Send + Sync>;

/// Class-identifier table of dependency factories
///
/// The registry is assembled before the facade is built and immutable
/// afterwards; recreation on the read path only borrows it.
#[derive(Default)]
pub struct DependencyRegistry {
    factories: HashMap<String, DependencyFactory>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `class_name`, replacing any previous one
    pub fn register<F>(&mut self, class_name: impl Into<String>, factory: F)
    where
        F: Fn(&Map<String, Value>, Value) -> Result<Box<dyn Dependency>, CacheError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(class_name.into(), Box::new(factory));
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// Instantiate the recorded class with the recorded config, restoring
    /// the write-time snapshot without re-evaluating
    pub fn recreate(&self, meta: &DependencyMetadata) -> Result<Box<dyn Dependency>, CacheError> {
        let factory = self
            .factories
            .get(meta.class_name())
            .ok_or_else(|| CacheError::UnknownDependencyClass(meta.class_name().to_string()))?;
        factory(meta.config(), meta.evaluated_data().clone())
    }
}

impl std::fmt::Debug for DependencyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        classes.sort_unstable();
        f.debug_struct("DependencyRegistry")
            .field("classes", &classes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedDependency {
        evaluated: Value,
        current: Value,
    }

    impl Dependency for FixedDependency {
        fn class_name(&self) -> &'static str {
            "fixed"
        }

        fn config(&self) -> Map<String, Value> {
            Map::new()
        }

        fn evaluated_data(&self) -> Value {
            self.evaluated.clone()
        }

        fn evaluate(&self) -> Value {
            self.current.clone()
        }
    }

    #[test]
    fn test_is_changed_compares_snapshots() {
        let unchanged = FixedDependency {
            evaluated: json!(1),
            current: json!(1),
        };
        assert!(!unchanged.is_changed());

        let changed = FixedDependency {
            evaluated: json!(1),
            current: json!(2),
        };
        assert!(changed.is_changed());
    }

    #[test]
    fn test_recreate_unknown_class() {
        let registry = DependencyRegistry::new();
        let meta = DependencyMetadata::from_dependency(&FixedDependency {
            evaluated: json!(null),
            current: json!(null),
        });

        match registry.recreate(&meta) {
            Err(CacheError::UnknownDependencyClass(class)) => assert_eq!(class, "fixed"),
            other => panic!("expected UnknownDependencyClass, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_registry_dispatches_by_class() {
        let mut registry = DependencyRegistry::new();
        registry.register("fixed", |_config, evaluated| {
            Ok(Box::new(FixedDependency {
                evaluated,
                current: json!("world"),
            }) as Box<dyn Dependency>)
        });
        assert!(registry.contains("fixed"));

        let meta = DependencyMetadata::from_dependency(&FixedDependency {
            evaluated: json!("world"),
            current: json!("world"),
        });
        let recreated = registry.recreate(&meta).unwrap();
        assert!(!recreated.is_changed());
    }
}
