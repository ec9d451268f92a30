use std::sync::Arc;

use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;

use super::cursor::Cursor;
use super::exec::find_docs;
use super::project::Projection;
use super::types::{Filter, FindOptions, SortSpec};

/// Immutable query builder. Accumulates projection/sort/skip/limit intents
/// and only touches the collection on the terminal [`FindBuilder::execute`]
/// (or [`FindBuilder::to_vec`]) call, with no hidden cursor state in between.
#[derive(Clone)]
pub struct FindBuilder {
    collection: Arc<Collection>,
    filter: Filter,
    opts: FindOptions,
}

impl FindBuilder {
    pub(crate) fn new(collection: Arc<Collection>, filter: Filter) -> Self {
        Self { collection, filter, opts: FindOptions::default() }
    }

    #[must_use]
    pub fn projection(mut self, projection: Projection) -> Self {
        self.opts.projection = Some(projection);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.opts.sort = Some(sort);
        self
    }

    #[must_use]
    pub fn skip(mut self, n: usize) -> Self {
        self.opts.skip = Some(n);
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.opts.limit = Some(n);
        self
    }

    /// # Errors
    /// Usage errors from the accumulated options (`InvalidLimit`,
    /// `InvalidProjection`), surfaced before any record is scanned.
    pub fn execute(self) -> Result<Cursor, DbError> {
        find_docs(&self.collection, &self.filter, &self.opts)
    }

    /// Executes and materializes in one step.
    ///
    /// # Errors
    /// Same as [`FindBuilder::execute`].
    pub fn to_vec(self) -> Result<Vec<Document>, DbError> {
        Ok(self.execute()?.to_vec())
    }
}
