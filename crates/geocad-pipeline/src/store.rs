//! Named Result Store: run-scoped map of result key to feature collection.

use indexmap::IndexMap;

use geocad_types::{FeatureCollection, GeocadError, Result};

#[derive(Debug, Clone)]
struct Entry {
    owner: String,
    collection: FeatureCollection,
}

/// Insertion-ordered store of every intermediate and final result of a run.
///
/// Only the executor writes; operations see it through
/// [`OperationContext`](crate::OperationContext).
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    entries: IndexMap<String, Entry>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `collection` under `key` on behalf of layer `owner`.
    ///
    /// Fails with `DuplicateResult` when `owner` already wrote `key`. When the
    /// key belonged to another layer it is replaced and the previous owner is
    /// returned so the caller can report it.
    pub fn put(
        &mut self,
        owner: &str,
        key: impl Into<String>,
        collection: FeatureCollection,
    ) -> Result<Option<String>> {
        let key = key.into();
        if let Some(existing) = self.entries.get(&key) {
            if existing.owner == owner {
                return Err(GeocadError::DuplicateResult {
                    key,
                    layer: owner.to_string(),
                });
            }
        }
        Ok(self.insert(owner, key, collection))
    }

    /// Store `collection` under `key`, replacing any previous entry.
    pub fn put_overwrite(
        &mut self,
        owner: &str,
        key: impl Into<String>,
        collection: FeatureCollection,
    ) -> Option<String> {
        self.insert(owner, key.into(), collection)
    }

    fn insert(&mut self, owner: &str, key: String, collection: FeatureCollection) -> Option<String> {
        let previous = self.entries.insert(
            key,
            Entry {
                owner: owner.to_string(),
                collection,
            },
        );
        previous.map(|e| e.owner)
    }

    pub fn get(&self, key: &str) -> Result<&FeatureCollection> {
        self.entries
            .get(key)
            .map(|e| &e.collection)
            .ok_or_else(|| GeocadError::MissingResult {
                key: key.to_string(),
            })
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Layer that wrote `key`.
    pub fn owner(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.owner.as_str())
    }

    /// Keys in write order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
