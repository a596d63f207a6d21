//! Serializable dependency snapshot
//!
//! `DependencyMetadata` is the persisted form of a dependency: the class
//! identifier, its public configuration, and the snapshot it evaluated at
//! write time. It travels inside the wrapped value envelope and is turned
//! back into a live dependency through the registry on read.

use serde_json::{Map, Value};

use super::{Dependency, DependencyRegistry};
use crate::cache::types::error_types::CacheError;

/// JSON-text serde module for open-typed fields
///
/// `serde_json::Value` needs a self-describing format to deserialize, so
/// the config and snapshot travel as embedded JSON text; this keeps the
/// metadata decodable through non-self-describing wire codecs.
mod json_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: serde::Serialize,
        S: Serializer,
    {
        let text = serde_json::to_string(value).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: serde::de::DeserializeOwned,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        serde_json::from_str(&text).map_err(serde::de::Error::custom)
    }
}

/// Persisted snapshot of a dependency object
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DependencyMetadata {
    class_name: String,
    #[serde(with = "json_text")]
    config: Map<String, Value>,
    #[serde(with = "json_text")]
    evaluated_data: Value,
}

impl DependencyMetadata {
    /// Assemble metadata from its parts
    pub fn new(class_name: impl Into<String>, config: Map<String, Value>, evaluated_data: Value) -> Self {
        Self {
            class_name: class_name.into(),
            config,
            evaluated_data,
        }
    }

    /// Capture a live dependency into its persisted form
    ///
    /// The config mapping holds the public configuration fields only; the
    /// evaluated snapshot is carried separately so `recreate` can restore
    /// it without re-evaluating.
    pub fn from_dependency(dependency: &dyn Dependency) -> Self {
        Self {
            class_name: dependency.class_name().to_string(),
            config: dependency.config(),
            evaluated_data: dependency.evaluated_data(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn evaluated_data(&self) -> &Value {
        &self.evaluated_data
    }

    /// Rebuild a live dependency carrying the write-time snapshot
    ///
    /// The recreated instance reports the write-time `evaluated_data`, so
    /// a later `is_changed` compares the captured world against the
    /// current one.
    pub fn recreate(&self, registry: &DependencyRegistry) -> Result<Box<dyn Dependency>, CacheError> {
        registry.recreate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct CounterDependency {
        count: i64,
        snapshot: i64,
    }

    impl Dependency for CounterDependency {
        fn class_name(&self) -> &'static str {
            "counter"
        }

        fn config(&self) -> Map<String, Value> {
            let mut config = Map::new();
            config.insert("count".to_string(), json!(self.count));
            config
        }

        fn evaluated_data(&self) -> Value {
            json!(self.snapshot)
        }

        fn evaluate(&self) -> Value {
            json!(self.count)
        }
    }

    #[test]
    fn test_capture_excludes_snapshot_from_config() {
        let dependency = CounterDependency {
            count: 7,
            snapshot: 3,
        };
        let meta = DependencyMetadata::from_dependency(&dependency);

        assert_eq!(meta.class_name(), "counter");
        assert_eq!(meta.config().get("count"), Some(&json!(7)));
        assert_eq!(meta.evaluated_data(), &json!(3));
    }

    #[test]
    fn test_recreate_restores_snapshot_without_reevaluating() {
        let mut registry = DependencyRegistry::new();
        registry.register("counter", |config, evaluated| {
            let count = config
                .get("count")
                .and_then(Value::as_i64)
                .ok_or_else(|| CacheError::DependencyFormat("missing count".to_string()))?;
            let snapshot = evaluated
                .as_i64()
                .ok_or_else(|| CacheError::DependencyFormat("missing snapshot".to_string()))?;
            Ok(Box::new(CounterDependency { count, snapshot }) as Box<dyn Dependency>)
        });

        let meta = DependencyMetadata::from_dependency(&CounterDependency {
            count: 7,
            snapshot: 3,
        });
        let recreated = meta.recreate(&registry).unwrap();

        // The write-time snapshot survives; the current world differs
        assert_eq!(recreated.evaluated_data(), json!(3));
        assert!(recreated.is_changed());
    }

    #[test]
    fn test_serde_round_trip() {
        let meta = DependencyMetadata::from_dependency(&CounterDependency {
            count: 1,
            snapshot: 1,
        });
        let encoded = serde_json::to_string(&meta).unwrap();
        let decoded: DependencyMetadata = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, meta);
    }
}
