use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid projection: {0}")]
    InvalidProjection(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("collection not found: {0}")]
    NoSuchCollection(String),

    #[error("collection already exists: {0}")]
    CollectionAlreadyExists(String),

    #[error("duplicate document id: {0}")]
    DuplicateId(String),

    #[error("invalid document id: {0}")]
    InvalidDocumentId(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),
}
