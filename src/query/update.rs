use bson::{Bson, Document as BsonDocument};

use crate::document::{Document, ID_FIELD};
use crate::errors::DbError;
use crate::schema::Schema;

use super::eval::{as_f64_num, is_num};
use super::types::UpdateDoc;

/// Structural checks on an update specification, run once before any record
/// is touched: the spec must be non-empty and must not reference `_id`.
///
/// # Errors
/// `InvalidUpdate` on an empty spec or an `_id` path.
pub(crate) fn validate_update(upd: &UpdateDoc) -> Result<(), DbError> {
    if upd.is_empty() {
        return Err(DbError::InvalidUpdate("update specification is empty".to_string()));
    }
    for path in upd.paths() {
        if path == ID_FIELD || path.starts_with("_id.") {
            return Err(DbError::InvalidUpdate("the _id field is immutable".to_string()));
        }
    }
    Ok(())
}

/// Strict-mode gate: fields the update would introduce must be declared.
pub(crate) fn check_schema(schema: &Schema, upd: &UpdateDoc) -> Result<(), DbError> {
    schema.check_fields(upd.introduced())
}

/// Applies one update to one record, all-or-nothing: mutations land on a
/// scratch body and are committed only when every pair applied cleanly.
/// Returns whether the record actually changed.
///
/// # Errors
/// `InvalidUpdate` when `$inc` meets a non-numeric existing value; the
/// record is left untouched.
pub fn apply_update(doc: &mut Document, upd: &UpdateDoc) -> Result<bool, DbError> {
    let mut data = doc.data.clone();
    let mut changed = false;
    match upd {
        UpdateDoc::Set(pairs) => {
            for (path, value) in pairs {
                if set_path(&mut data, path, value.clone()) {
                    changed = true;
                }
            }
        }
        UpdateDoc::Inc(pairs) => {
            for (path, by) in pairs {
                let cur = get_path_owned(&data, path).unwrap_or(Bson::Double(0.0));
                if !is_num(&cur) {
                    return Err(DbError::InvalidUpdate(format!(
                        "cannot apply $inc to non-numeric field {path}"
                    )));
                }
                if set_path(&mut data, path, Bson::Double(as_f64_num(&cur) + by)) {
                    changed = true;
                }
            }
        }
        UpdateDoc::Unset(paths) => {
            for path in paths {
                if unset_path(&mut data, path) {
                    changed = true;
                }
            }
        }
    }
    if changed {
        doc.data = data;
        doc.touch();
    }
    Ok(changed)
}

fn ensure_subdoc<'a>(root: &'a mut BsonDocument, key: &str) -> &'a mut BsonDocument {
    let needs_new = !matches!(root.get(key), Some(Bson::Document(_)));
    if needs_new {
        root.insert(key.to_string(), Bson::Document(BsonDocument::new()));
    }
    match root.get_mut(key) {
        Some(Bson::Document(d)) => d,
        _ => unreachable!(),
    }
}

fn traverse_to_parent<'a>(root: &'a mut BsonDocument, path: &str) -> (&'a mut BsonDocument, String) {
    let mut cur = root;
    let mut iter = path.split('.').peekable();
    let mut last = String::new();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            last = seg.to_string();
            break;
        }
        cur = ensure_subdoc(cur, seg);
    }
    (cur, last)
}

pub(crate) fn set_path(root: &mut BsonDocument, path: &str, value: Bson) -> bool {
    let (parent, last) = traverse_to_parent(root, path);
    let old = parent.insert(last, value.clone());
    old.as_ref() != Some(&value)
}

fn get_path_owned(root: &BsonDocument, path: &str) -> Option<Bson> {
    super::eval::get_path(root, path).cloned()
}

fn unset_path(root: &mut BsonDocument, path: &str) -> bool {
    let mut cur = root;
    let mut iter = path.split('.').peekable();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            return cur.remove(seg).is_some();
        }
        match cur.get_mut(seg) {
            Some(Bson::Document(d)) => cur = d,
            // Unsetting below a non-document parent is a no-op, not an error.
            _ => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn set_is_idempotent() {
        let mut d = Document::new(doc! {"age": 8}).unwrap();
        let upd = UpdateDoc::set([("age", Bson::Int32(9))]);
        assert!(apply_update(&mut d, &upd).unwrap());
        let after_once = d.data.clone();
        assert!(!apply_update(&mut d, &upd).unwrap());
        assert_eq!(d.data, after_once);
    }

    #[test]
    fn inc_creates_missing_and_descends() {
        let mut d = Document::new(doc! {"info": {"visits": 1}}).unwrap();
        let upd = UpdateDoc::Inc(vec![("info.visits".into(), 2.0), ("clicks".into(), 1.0)]);
        assert!(apply_update(&mut d, &upd).unwrap());
        assert_eq!(d.data.get_document("info").unwrap().get_f64("visits").unwrap(), 3.0);
        assert_eq!(d.data.get_f64("clicks").unwrap(), 1.0);
    }

    #[test]
    fn inc_on_non_numeric_leaves_record_untouched() {
        let mut d = Document::new(doc! {"name": "alice", "age": 3}).unwrap();
        let before = d.data.clone();
        let upd = UpdateDoc::Inc(vec![("age".into(), 1.0), ("name".into(), 1.0)]);
        assert!(apply_update(&mut d, &upd).is_err());
        assert_eq!(d.data, before);
    }

    #[test]
    fn id_paths_are_rejected_structurally() {
        let upd = UpdateDoc::set([("_id", Bson::String("other".into()))]);
        assert!(matches!(validate_update(&upd), Err(DbError::InvalidUpdate(_))));
    }
}
