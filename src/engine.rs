use crate::collection::{Collection, CollectionOptions};
use crate::errors::DbError;
use crate::types::CollectionName;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory registry of named collections. Handles are `Arc`s passed
/// explicitly to callers; there is no process-wide connection state.
#[derive(Default)]
pub struct Engine {
    collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("collections", &self.list_collection_names()).finish()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection with default options, or returns the existing
    /// handle under that name.
    pub fn create_collection(&self, name: impl Into<String>) -> Arc<Collection> {
        self.create_collection_with(name, CollectionOptions::default())
    }

    pub fn create_collection_with(
        &self,
        name: impl Into<String>,
        options: CollectionOptions,
    ) -> Arc<Collection> {
        let name = name.into();
        let mut cols = self.collections.write();
        cols.entry(name.clone())
            .or_insert_with(|| {
                log::debug!("create collection {name}");
                Arc::new(Collection::new(name.clone(), options))
            })
            .clone()
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    pub fn delete_collection(&self, name: &str) -> bool {
        let removed = self.collections.write().remove(name).is_some();
        if removed {
            log::debug!("delete collection {name}");
        }
        removed
    }

    /// # Errors
    /// `NoSuchCollection` when `old` is absent, `CollectionAlreadyExists`
    /// when `new` is taken.
    pub fn rename_collection(&self, old: &str, new: &str) -> Result<(), DbError> {
        let mut cols = self.collections.write();
        if cols.contains_key(new) {
            return Err(DbError::CollectionAlreadyExists(new.to_string()));
        }
        let col = cols.remove(old).ok_or_else(|| DbError::NoSuchCollection(old.to_string()))?;
        col.set_name(new.to_string());
        cols.insert(new.to_string(), col);
        Ok(())
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}
