use bson::Document as BsonDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::document::ID_FIELD;
use crate::errors::DbError;

use super::types::MAX_PROJECTION_FIELDS;

/// Field inclusion/exclusion intents, in caller order.
///
/// Intents must be purely inclusive or purely exclusive for fields other
/// than `_id`; `_id` itself may carry either intent in any mode. Validation
/// happens in [`Projection::plan`], before any record is scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub fields: Vec<(String, bool)>,
}

impl Projection {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fields: fields.into_iter().map(|f| (f.into(), true)).collect() }
    }

    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fields: fields.into_iter().map(|f| (f.into(), false)).collect() }
    }

    #[must_use]
    pub fn without_id(mut self) -> Self {
        self.fields.push((ID_FIELD.to_string(), false));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validates the intents into an executable plan.
    ///
    /// # Errors
    /// `InvalidProjection` on mixed include/exclude intents for non-`_id`
    /// fields, surfaced fail-fast and never mid-stream.
    pub fn plan(&self) -> Result<ProjectionPlan, DbError> {
        let mut includes: BTreeSet<String> = BTreeSet::new();
        let mut excludes: BTreeSet<String> = BTreeSet::new();
        let mut id_intent: Option<bool> = None;
        for (field, included) in self.fields.iter().take(MAX_PROJECTION_FIELDS) {
            if field == ID_FIELD {
                id_intent = Some(*included);
            } else if *included {
                includes.insert(field.clone());
            } else {
                excludes.insert(field.clone());
            }
        }
        if !includes.is_empty() && !excludes.is_empty() {
            return Err(DbError::InvalidProjection(
                "cannot mix inclusion and exclusion of non-_id fields".to_string(),
            ));
        }
        if !includes.is_empty() {
            return Ok(ProjectionPlan::Include {
                fields: includes,
                include_id: id_intent.unwrap_or(true),
            });
        }
        if !excludes.is_empty() {
            if id_intent == Some(false) {
                excludes.insert(ID_FIELD.to_string());
            }
            return Ok(ProjectionPlan::Exclude { fields: excludes });
        }
        // Only an _id intent (or nothing at all).
        Ok(match id_intent {
            Some(false) => {
                ProjectionPlan::Exclude { fields: BTreeSet::from([ID_FIELD.to_string()]) }
            }
            _ => ProjectionPlan::Identity,
        })
    }
}

/// Executable form of a validated projection.
#[derive(Debug, Clone)]
pub enum ProjectionPlan {
    Identity,
    Include { fields: BTreeSet<String>, include_id: bool },
    Exclude { fields: BTreeSet<String> },
}

impl ProjectionPlan {
    /// Applies the plan to one record body, preserving the body's field
    /// order in the output.
    #[must_use]
    pub fn apply(&self, data: &BsonDocument) -> BsonDocument {
        match self {
            Self::Identity => data.clone(),
            Self::Include { fields, include_id } => {
                let mut out = BsonDocument::new();
                for (k, v) in data {
                    let keep = if k == ID_FIELD { *include_id } else { fields.contains(k) };
                    if keep {
                        out.insert(k.clone(), v.clone());
                    }
                }
                out
            }
            Self::Exclude { fields } => {
                let mut out = BsonDocument::new();
                for (k, v) in data {
                    if !fields.contains(k) {
                        out.insert(k.clone(), v.clone());
                    }
                }
                out
            }
        }
    }
}
