use crate::types::DocumentId;
use bson::Bson;
use serde::{Deserialize, Serialize};

use super::project::Projection;

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;
pub(crate) const MAX_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

/// Options for `find_docs`. `limit` must be positive when present; a zero
/// limit is rejected before the scan starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Option<Vec<SortSpec>>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

/// Comparison operators over a record field.
///
/// The ordered operators (`Gt`/`Gte`/`Lt`/`Lte`) require the field to be
/// present: a record missing the field never satisfies them. Callers that
/// mean "present and less than" combine with an `Exists` guard. `Eq` against
/// `null` does match a missing field; `Eq` against anything else does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Predicate tree selecting matching records. An empty `And` matches every
/// record; an empty `Or` matches none.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
    Expr(Expr),
    #[cfg(feature = "regex")]
    Regex { path: String, pattern: String, case_insensitive: bool },
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.into(), op: CmpOp::Eq, value: value.into() }
    }

    pub fn cmp(path: impl Into<String>, op: CmpOp, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.into(), op, value: value.into() }
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Self::Exists { path: path.into(), exists: true }
    }
}

/// Arithmetic/comparison expression evaluated against the current record.
///
/// Field references resolve against the record under scan; an unresolved
/// reference makes the enclosing comparison a no-match rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(String),
    Literal(Bson),
    Add(Vec<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Vec<Expr>),
    Cmp { op: CmpOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field(path.into())
    }

    pub fn lit(value: impl Into<Bson>) -> Self {
        Self::Literal(value.into())
    }

    pub fn cmp(op: CmpOp, lhs: Self, rhs: Self) -> Self {
        Self::Cmp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }
}

/// One update operation: exactly one operator kind per call, applied to one
/// or more field/value pairs. Application is all-or-nothing per record.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDoc {
    Set(Vec<(String, Bson)>),
    Inc(Vec<(String, f64)>),
    Unset(Vec<String>),
}

impl UpdateDoc {
    pub fn set<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Bson)>,
        S: Into<String>,
    {
        Self::Set(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// All field paths the update references.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::Set(pairs) => pairs.iter().map(|(k, _)| k.as_str()).collect(),
            Self::Inc(pairs) => pairs.iter().map(|(k, _)| k.as_str()).collect(),
            Self::Unset(keys) => keys.iter().map(String::as_str).collect(),
        }
    }

    /// Field paths the update may introduce into a record. `Unset` never
    /// introduces anything, so strict schemas ignore it.
    pub fn introduced(&self) -> Vec<&str> {
        match self {
            Self::Set(_) | Self::Inc(_) => self.paths(),
            Self::Unset(_) => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Set(pairs) => pairs.is_empty(),
            Self::Inc(pairs) => pairs.is_empty(),
            Self::Unset(keys) => keys.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    pub upsert: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceOptions {
    pub upsert: bool,
}

/// Options for the find-and-modify family. `return_original` defaults to
/// `true`: the pre-mutation snapshot comes back unless the caller opts into
/// the post-mutation one.
#[derive(Debug, Clone, Copy)]
pub struct FindAndModifyOptions {
    pub return_original: bool,
    pub upsert: bool,
}

impl Default for FindAndModifyOptions {
    fn default() -> Self {
        Self { return_original: true, upsert: false }
    }
}

impl FindAndModifyOptions {
    #[must_use]
    pub fn returning_new(mut self) -> Self {
        self.return_original = false;
        self
    }
}

/// Result of a write operation. `acknowledged` mirrors the collection's
/// durability acknowledgment mode.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationSummary {
    pub matched: u64,
    pub modified: u64,
    pub upserted_id: Option<DocumentId>,
    pub acknowledged: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub deleted: u64,
    pub acknowledged: bool,
}
