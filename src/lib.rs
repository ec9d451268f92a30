pub mod collection;
pub mod document;
pub mod engine;
pub mod errors;
pub mod logger;
pub mod query;
pub mod schema;
pub mod types;

use crate::collection::{Collection, CollectionOptions};
use crate::document::Document;
use crate::engine::Engine;
use crate::errors::DbError;
use std::sync::Arc;

/// The main database struct: a facade over [`Engine`] for callers that
/// address collections by name instead of holding handles.
#[derive(Debug, Default)]
pub struct Database {
    engine: Arc<Engine>,
}

impl Database {
    /// Creates a new in-memory database instance.
    #[must_use]
    pub fn new() -> Self {
        Self { engine: Arc::new(Engine::new()) }
    }

    /// Creates a new collection with the given name.
    pub fn create_collection(&self, name: &str) -> Arc<Collection> {
        self.engine.create_collection(name)
    }

    /// Creates a collection with explicit options (acknowledgment mode,
    /// strict schema).
    pub fn create_collection_with(&self, name: &str, options: CollectionOptions) -> Arc<Collection> {
        self.engine.create_collection_with(name, options)
    }

    /// Retrieves a collection by its name.
    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.engine.get_collection(name)
    }

    /// Deletes a collection by its name.
    pub fn delete_collection(&self, name: &str) -> bool {
        self.engine.delete_collection(name)
    }

    /// Lists the names of all collections.
    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        self.engine.list_collection_names()
    }

    /// Rename a collection.
    ///
    /// # Errors
    /// `NoSuchCollection` / `CollectionAlreadyExists`.
    pub fn rename_collection(&self, old: &str, new: &str) -> Result<(), DbError> {
        self.engine.rename_collection(old, new)
    }

    // --- Query API (façade over query module) ---

    /// # Errors
    /// `NoSuchCollection`, plus usage errors at execution time.
    pub fn find(
        &self,
        collection_name: &str,
        filter: query::Filter,
    ) -> Result<query::FindBuilder, DbError> {
        Ok(self.handle(collection_name)?.find(filter))
    }

    /// # Errors
    /// `NoSuchCollection`.
    pub fn find_one(
        &self,
        collection_name: &str,
        filter: &query::Filter,
    ) -> Result<Option<Document>, DbError> {
        Ok(self.handle(collection_name)?.find_one(filter))
    }

    /// # Errors
    /// `NoSuchCollection`.
    pub fn count(&self, collection_name: &str, filter: &query::Filter) -> Result<usize, DbError> {
        Ok(self.handle(collection_name)?.count(filter))
    }

    /// # Errors
    /// `NoSuchCollection`, plus insert errors.
    pub fn insert_many(
        &self,
        collection_name: &str,
        bodies: Vec<bson::Document>,
    ) -> Result<Vec<Document>, DbError> {
        self.handle(collection_name)?.insert_many(bodies)
    }

    /// # Errors
    /// `NoSuchCollection`, plus structural update errors.
    pub fn update_one(
        &self,
        collection_name: &str,
        filter: &query::Filter,
        upd: &query::UpdateDoc,
        opts: query::UpdateOptions,
    ) -> Result<query::MutationSummary, DbError> {
        self.handle(collection_name)?.update_one(filter, upd, opts)
    }

    /// # Errors
    /// `NoSuchCollection`, plus structural update errors.
    pub fn update_many(
        &self,
        collection_name: &str,
        filter: &query::Filter,
        upd: &query::UpdateDoc,
        opts: query::UpdateOptions,
    ) -> Result<query::MutationSummary, DbError> {
        self.handle(collection_name)?.update_many(filter, upd, opts)
    }

    /// # Errors
    /// `NoSuchCollection`, plus replace errors.
    pub fn replace_one(
        &self,
        collection_name: &str,
        filter: &query::Filter,
        replacement: bson::Document,
        opts: query::ReplaceOptions,
    ) -> Result<query::MutationSummary, DbError> {
        self.handle(collection_name)?.replace_one(filter, replacement, opts)
    }

    /// # Errors
    /// `NoSuchCollection`.
    pub fn delete_one(
        &self,
        collection_name: &str,
        filter: &query::Filter,
    ) -> Result<query::DeleteSummary, DbError> {
        Ok(self.handle(collection_name)?.delete_one(filter))
    }

    /// # Errors
    /// `NoSuchCollection`.
    pub fn delete_many(
        &self,
        collection_name: &str,
        filter: &query::Filter,
    ) -> Result<query::DeleteSummary, DbError> {
        Ok(self.handle(collection_name)?.delete_many(filter))
    }

    fn handle(&self, collection_name: &str) -> Result<Arc<Collection>, DbError> {
        self.engine
            .get_collection(collection_name)
            .ok_or_else(|| DbError::NoSuchCollection(collection_name.to_string()))
    }
}

/// Initializes the database system.
///
/// This function should be called before any other database operations.
/// It sets up the logger and other necessary components.
///
/// # Errors
/// Fails when the global logger is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::init()?;
    Ok(())
}
