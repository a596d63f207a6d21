//! Tag-based invalidation adapter
//!
//! `TagStore` holds a monotonically bumped version per tag; `TagDependency`
//! snapshots the versions of its tags at write time and reports a change
//! once any of them is bumped. Invalidating a tag therefore invalidates
//! every cached entry whose dependency captured that tag, without touching
//! the entries themselves.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};

use super::{Dependency, DependencyRegistry};
use crate::cache::types::error_types::CacheError;

/// Shared per-tag version counters
#[derive(Debug, Default)]
pub struct TagStore {
    versions: DashMap<String, u64>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version of a tag; a never-invalidated tag reports 0
    pub fn version(&self, tag: &str) -> u64 {
        self.versions.get(tag).map(|entry| *entry).unwrap_or(0)
    }

    /// Bump a tag's version, invalidating every dependency that captured it
    pub fn invalidate(&self, tag: &str) -> u64 {
        let mut entry = self.versions.entry(tag.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Bump several tags at once
    pub fn invalidate_all<I, S>(&self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.invalidate(tag.as_ref());
        }
    }
}

/// Dependency on a set of tags in a `TagStore`
pub struct TagDependency {
    store: Arc<TagStore>,
    tags: Vec<String>,
    evaluated: Value,
}

impl TagDependency {
    /// Class identifier used in metadata and the registry
    pub const CLASS_NAME: &'static str = "tags";

    /// Capture the current versions of `tags` as the write-time snapshot
    pub fn new<I, S>(store: Arc<TagStore>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        let evaluated = Self::snapshot(&store, &tags);
        Self {
            store,
            tags,
            evaluated,
        }
    }

    /// Rebuild a dependency carrying a previously captured snapshot
    fn restored(store: Arc<TagStore>, tags: Vec<String>, evaluated: Value) -> Self {
        Self {
            store,
            tags,
            evaluated,
        }
    }

    fn snapshot(store: &TagStore, tags: &[String]) -> Value {
        let mut versions = Map::new();
        for tag in tags {
            versions.insert(tag.clone(), Value::from(store.version(tag)));
        }
        Value::Object(versions)
    }

    /// Register the factory for this class against `store`
    pub fn register(store: Arc<TagStore>, registry: &mut DependencyRegistry) {
        registry.register(Self::CLASS_NAME, move |config, evaluated| {
            let tags = config
                .get("tags")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    CacheError::DependencyFormat("tag dependency config lacks a tags array".to_string())
                })?
                .iter()
                .map(|tag| {
                    tag.as_str().map(str::to_string).ok_or_else(|| {
                        CacheError::DependencyFormat(format!("non-string tag: {}", tag))
                    })
                })
                .collect::<Result<Vec<String>, CacheError>>()?;
            Ok(Box::new(TagDependency::restored(store.clone(), tags, evaluated))
                as Box<dyn Dependency>)
        });
    }
}

impl Dependency for TagDependency {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert(
            "tags".to_string(),
            Value::Array(self.tags.iter().cloned().map(Value::from).collect()),
        );
        config
    }

    fn evaluated_data(&self) -> Value {
        self.evaluated.clone()
    }

    fn evaluate(&self) -> Value {
        Self::snapshot(&self.store, &self.tags)
    }
}

impl std::fmt::Debug for TagDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagDependency")
            .field("tags", &self.tags)
            .field("evaluated", &self.evaluated)
            .finish()
    }
}
