use crate::errors::DbError;
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the identity field mirrored into every record body.
pub const ID_FIELD: &str = "_id";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self { created_at: now, updated_at: now }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

/// One record of a collection: an immutable identity plus a dynamically
/// shaped BSON body. The identity is mirrored into the body under `_id` so
/// filters, projections and replacements see one uniform field space.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: BsonDocument,
    pub metadata: Metadata,
}

impl Document {
    /// Builds a record from a BSON body.
    ///
    /// A fresh identity is assigned when the body carries no `_id`. A
    /// caller-supplied `_id` must be a BSON string.
    ///
    /// # Errors
    /// Returns `InvalidDocumentId` for a non-string `_id`.
    pub fn new(body: BsonDocument) -> Result<Self, DbError> {
        let id = match body.get(ID_FIELD) {
            None => DocumentId::new(),
            Some(Bson::String(s)) => DocumentId(s.clone()),
            Some(other) => {
                return Err(DbError::InvalidDocumentId(format!(
                    "_id must be a string, got {other}"
                )));
            }
        };
        Ok(Self { data: body_with_id(&id, body), id, metadata: Metadata::new() })
    }

    /// Swaps the entire body for `new_data`, which must already carry the
    /// record's own `_id`. Bumps `updated_at`.
    pub(crate) fn replace_data(&mut self, new_data: BsonDocument) {
        self.data = new_data;
        self.touch();
    }

    pub(crate) fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }
}

/// Rebuilds `body` with `_id` as the leading field, dropping any `_id` the
/// caller placed elsewhere in it.
pub(crate) fn body_with_id(id: &DocumentId, body: BsonDocument) -> BsonDocument {
    let mut data = BsonDocument::new();
    data.insert(ID_FIELD, Bson::String(id.0.clone()));
    for (k, v) in body {
        if k != ID_FIELD {
            data.insert(k, v);
        }
    }
    data
}
