use crate::document::Document;
use crate::schema::Schema;
use crate::types::DocumentId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-collection configuration.
///
/// `ack` mirrors the session's durability acknowledgment into every write
/// summary; this layer does not implement durability itself.
#[derive(Debug, Clone)]
pub struct CollectionOptions {
    pub ack: bool,
    pub schema: Schema,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self { ack: true, schema: Schema::flexible() }
    }
}

/// Backing store: keyed by identity, with insertion order preserved for
/// unsorted scans. Guarded as a unit so a write holds one lock across
/// filter-evaluate-then-mutate and readers never observe a torn record.
#[derive(Debug, Default)]
pub(crate) struct Store {
    docs: HashMap<DocumentId, Document>,
    order: Vec<DocumentId>,
}

impl Store {
    pub(crate) fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.docs.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &DocumentId) -> Option<&mut Document> {
        self.docs.get_mut(id)
    }

    pub(crate) fn contains(&self, id: &DocumentId) -> bool {
        self.docs.contains_key(id)
    }

    pub(crate) fn insert(&mut self, doc: Document) {
        if !self.docs.contains_key(&doc.id) {
            self.order.push(doc.id.clone());
        }
        self.docs.insert(doc.id.clone(), doc);
    }

    pub(crate) fn remove(&mut self, id: &DocumentId) -> Option<Document> {
        let removed = self.docs.remove(id);
        if removed.is_some() {
            self.order.retain(|x| x != id);
        }
        removed
    }

    /// Iterates in insertion order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Document> {
        self.order.iter().filter_map(|id| self.docs.get(id))
    }

    pub(crate) fn ids(&self) -> Vec<DocumentId> {
        self.order.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.docs.len()
    }
}

pub struct Collection {
    pub name: Arc<RwLock<String>>,
    pub(crate) store: RwLock<Store>,
    options: CollectionOptions,
}

impl Collection {
    #[must_use]
    pub fn new(name: String, options: CollectionOptions) -> Self {
        Self { name: Arc::new(RwLock::new(name)), store: RwLock::new(Store::default()), options }
    }

    pub fn set_name(&self, new_name: String) {
        *self.name.write() = new_name;
    }

    /// Returns the collection's name as a String (cloned), hiding the `RwLock`.
    #[must_use]
    pub fn name_str(&self) -> String {
        self.name.read().clone()
    }

    #[must_use]
    pub const fn is_acknowledged(&self) -> bool {
        self.options.ack
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.options.schema
    }
}
