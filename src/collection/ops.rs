use super::core::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::query::{
    self, Cursor, DeleteSummary, Filter, FindAndModifyOptions, FindBuilder, MutationSummary,
    ReplaceOptions, UpdateDoc, UpdateOptions,
};
use crate::types::DocumentId;
use bson::Document as BsonDocument;
use std::collections::HashSet;
use std::sync::Arc;

impl Collection {
    /// Inserts one record body, assigning a fresh identity when the body
    /// carries no `_id`.
    ///
    /// # Errors
    /// `SchemaViolation` in strict mode, `InvalidDocumentId` for a
    /// non-string `_id`, `DuplicateId` when the identity is taken.
    pub fn insert_one(&self, body: BsonDocument) -> Result<Document, DbError> {
        self.schema().check_fields(body.keys().map(String::as_str))?;
        let doc = Document::new(body)?;
        let mut store = self.store.write();
        if store.contains(&doc.id) {
            return Err(DbError::DuplicateId(doc.id.to_string()));
        }
        store.insert(doc.clone());
        log::debug!("insert collection={} id={}", self.name_str(), doc.id);
        Ok(doc)
    }

    /// Inserts a batch. Duplicate non-identity content across records is
    /// fine; a duplicate identity fails the whole batch before any record
    /// lands.
    ///
    /// # Errors
    /// Same as [`Collection::insert_one`], checked for the full batch up
    /// front.
    pub fn insert_many(&self, bodies: Vec<BsonDocument>) -> Result<Vec<Document>, DbError> {
        for body in &bodies {
            self.schema().check_fields(body.keys().map(String::as_str))?;
        }
        let docs = bodies.into_iter().map(Document::new).collect::<Result<Vec<_>, _>>()?;
        let mut store = self.store.write();
        let mut seen: HashSet<&DocumentId> = HashSet::with_capacity(docs.len());
        for doc in &docs {
            if store.contains(&doc.id) || !seen.insert(&doc.id) {
                return Err(DbError::DuplicateId(doc.id.to_string()));
            }
        }
        for doc in &docs {
            store.insert(doc.clone());
        }
        log::debug!("insert_many collection={} count={}", self.name_str(), docs.len());
        Ok(docs)
    }

    #[must_use]
    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.store.read().get(id).cloned()
    }

    pub fn delete_document(&self, id: &DocumentId) -> bool {
        let removed = self.store.write().remove(id).is_some();
        if removed {
            log::debug!("delete collection={} id={id}", self.name_str());
        }
        removed
    }

    #[must_use]
    pub fn get_all_documents(&self) -> Vec<Document> {
        self.store.read().iter().cloned().collect()
    }

    /// Return only the IDs of all documents without cloning each document.
    #[must_use]
    pub fn list_ids(&self) -> Vec<DocumentId> {
        self.store.read().ids()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Query façade: thin delegations into the query module, callable straight
// off a collection handle.
impl Collection {
    #[must_use]
    pub fn find(self: &Arc<Self>, filter: Filter) -> FindBuilder {
        FindBuilder::new(self.clone(), filter)
    }

    #[must_use]
    pub fn find_one(self: &Arc<Self>, filter: &Filter) -> Option<Document> {
        query::find_one(self, filter)
    }

    /// # Errors
    /// `NotFound` when no record matches.
    pub fn find_one_required(self: &Arc<Self>, filter: &Filter) -> Result<Document, DbError> {
        query::find_one_required(self, filter)
    }

    #[must_use]
    pub fn count(self: &Arc<Self>, filter: &Filter) -> usize {
        query::count_docs(self, filter)
    }

    /// # Errors
    /// Structural errors from the update spec or strict schema.
    pub fn update_one(
        self: &Arc<Self>,
        filter: &Filter,
        upd: &UpdateDoc,
        opts: UpdateOptions,
    ) -> Result<MutationSummary, DbError> {
        query::update_one(self, filter, upd, opts)
    }

    /// # Errors
    /// Structural errors from the update spec or strict schema.
    pub fn update_many(
        self: &Arc<Self>,
        filter: &Filter,
        upd: &UpdateDoc,
        opts: UpdateOptions,
    ) -> Result<MutationSummary, DbError> {
        query::update_many(self, filter, upd, opts)
    }

    /// # Errors
    /// Structural errors, plus any per-record failure of the one targeted
    /// record.
    pub fn find_one_and_update(
        self: &Arc<Self>,
        filter: &Filter,
        upd: &UpdateDoc,
        opts: FindAndModifyOptions,
    ) -> Result<Option<Document>, DbError> {
        query::find_one_and_update(self, filter, upd, opts)
    }

    /// # Errors
    /// `SchemaViolation` in strict mode, `InvalidUpdate` on a conflicting
    /// `_id` in the replacement.
    pub fn replace_one(
        self: &Arc<Self>,
        filter: &Filter,
        replacement: BsonDocument,
        opts: ReplaceOptions,
    ) -> Result<MutationSummary, DbError> {
        query::replace_one(self, filter, replacement, opts)
    }

    /// # Errors
    /// Same as [`Collection::replace_one`].
    pub fn find_one_and_replace(
        self: &Arc<Self>,
        filter: &Filter,
        replacement: BsonDocument,
        opts: FindAndModifyOptions,
    ) -> Result<Option<Document>, DbError> {
        query::find_one_and_replace(self, filter, replacement, opts)
    }

    #[must_use]
    pub fn delete_one(self: &Arc<Self>, filter: &Filter) -> DeleteSummary {
        query::delete_one(self, filter)
    }

    #[must_use]
    pub fn delete_many(self: &Arc<Self>, filter: &Filter) -> DeleteSummary {
        query::delete_many(self, filter)
    }

    /// Lazy cursor over everything, insertion order.
    #[must_use]
    pub fn scan(self: &Arc<Self>) -> Cursor {
        Cursor::lazy(self.clone(), self.list_ids())
    }
}
