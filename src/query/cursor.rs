use crate::collection::Collection;
use crate::document::Document;
use crate::types::DocumentId;
use std::sync::Arc;

/// Lazy result sequence over a find.
///
/// The id-backed form re-reads each record on advance, so a record deleted
/// mid-iteration is simply skipped; the materialized form iterates a
/// snapshot. Either way a cursor is consumed once; call [`Cursor::to_vec`]
/// to materialize for re-iteration.
#[derive(Clone)]
pub struct Cursor {
    collection: Arc<Collection>,
    ids: Vec<DocumentId>,
    pos: usize,
    docs: Option<Vec<Document>>,
}

impl Cursor {
    pub(crate) fn lazy(collection: Arc<Collection>, ids: Vec<DocumentId>) -> Self {
        Self { collection, ids, pos: 0, docs: None }
    }

    pub(crate) fn materialized(collection: Arc<Collection>, docs: Vec<Document>) -> Self {
        Self { collection, ids: Vec::new(), pos: 0, docs: Some(docs) }
    }

    pub fn advance(&mut self) -> Option<Document> {
        if let Some(ref docs) = self.docs {
            if self.pos >= docs.len() {
                return None;
            }
            let d = docs[self.pos].clone();
            self.pos += 1;
            return Some(d);
        }
        while self.pos < self.ids.len() {
            let id = self.ids[self.pos].clone();
            self.pos += 1;
            if let Some(d) = self.collection.find_document(&id) {
                return Some(d);
            }
        }
        None
    }

    #[must_use]
    pub fn to_vec(mut self) -> Vec<Document> {
        if let Some(docs) = self.docs.take() {
            return docs;
        }
        let mut out = Vec::with_capacity(self.ids.len());
        while let Some(d) = self.advance() {
            out.push(d);
        }
        out
    }
}

impl Iterator for Cursor {
    type Item = Document;
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
