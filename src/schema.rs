use crate::document::ID_FIELD;
use crate::errors::DbError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Declared field names for a collection.
///
/// A flexible schema accepts any field. A strict schema rejects writes that
/// would introduce a field outside the declared set; the check runs at the
/// insert/update boundary, before any record is touched. Dotted paths are
/// judged by their root segment, and `_id` is always declared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: BTreeSet<String>,
    strict: bool,
}

impl Schema {
    #[must_use]
    pub fn flexible() -> Self {
        Self::default()
    }

    pub fn strict<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fields: fields.into_iter().map(Into::into).collect(), strict: true }
    }

    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    #[must_use]
    pub fn allows(&self, path: &str) -> bool {
        if !self.strict {
            return true;
        }
        let root = path.split('.').next().unwrap_or(path);
        root == ID_FIELD || self.fields.contains(root)
    }

    /// # Errors
    /// Returns `SchemaViolation` naming the first undeclared field.
    pub fn check_fields<'a, I>(&self, fields: I) -> Result<(), DbError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for f in fields {
            if !self.allows(f) {
                return Err(DbError::SchemaViolation(format!("undeclared field: {f}")));
            }
        }
        Ok(())
    }
}
