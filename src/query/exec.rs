use bson::{Bson, Document as BsonDocument};
use std::sync::Arc;

use crate::collection::{Collection, Store};
use crate::document::{self, Document, ID_FIELD};
use crate::errors::DbError;
use crate::types::DocumentId;

use super::cursor::Cursor;
use super::eval::{compare_docs, eval_filter};
use super::types::{
    CmpOp, DeleteSummary, Filter, FindAndModifyOptions, FindOptions, MAX_LIMIT, MAX_SORT_FIELDS,
    MutationSummary, ReplaceOptions, UpdateDoc, UpdateOptions,
};
use super::update::{apply_update, check_schema, set_path, validate_update};

/// Scan-side wrapper around [`eval_filter`]: a per-record evaluation error is
/// isolated to that record, which is treated as non-matching while the scan
/// continues.
pub(crate) fn filter_matches(data: &BsonDocument, filter: &Filter) -> bool {
    match eval_filter(data, filter) {
        Ok(matched) => matched,
        Err(e) => {
            log::warn!("filter evaluation failed, record treated as non-matching: {e}");
            false
        }
    }
}

/// Runs a find: filter, then sort, then skip/limit, then projection.
///
/// Usage errors (zero limit, mixed projection) surface before any record is
/// scanned. Without sort or projection the cursor stays id-backed and lazy;
/// otherwise the matching records are materialized up front.
///
/// # Errors
/// `InvalidLimit` for a zero limit, `InvalidProjection` for mixed intents.
pub fn find_docs(col: &Arc<Collection>, filter: &Filter, opts: &FindOptions) -> Result<Cursor, DbError> {
    if opts.limit == Some(0) {
        return Err(DbError::InvalidLimit("limit must be positive".to_string()));
    }
    let plan = opts.projection.as_ref().filter(|p| !p.is_empty()).map(|p| p.plan()).transpose()?;

    if plan.is_none() && opts.sort.is_none() {
        let ids: Vec<DocumentId> = {
            let store = col.store.read();
            store.iter().filter(|d| filter_matches(&d.data, filter)).map(|d| d.id.clone()).collect()
        };
        return Ok(Cursor::lazy(col.clone(), paginate(ids, opts)));
    }

    let mut docs: Vec<Document> = {
        let store = col.store.read();
        store.iter().filter(|d| filter_matches(&d.data, filter)).cloned().collect()
    };
    if let Some(sort) = &opts.sort {
        if sort.len() > MAX_SORT_FIELDS {
            log::warn!("sort spec too long: {}", sort.len());
        }
        // Vec::sort_by is stable: ties keep their insertion-order positions.
        docs.sort_by(|a, b| compare_docs(&a.data, &b.data, sort));
    }
    let mut docs = paginate(docs, opts);
    if let Some(plan) = &plan {
        for d in &mut docs {
            d.data = plan.apply(&d.data);
        }
    }
    Ok(Cursor::materialized(col.clone(), docs))
}

/// Sort always precedes skip, which always precedes limit. Skipping past the
/// end yields an empty sequence, not an error.
fn paginate<T>(mut items: Vec<T>, opts: &FindOptions) -> Vec<T> {
    let skip = opts.skip.unwrap_or(0);
    if skip >= items.len() {
        return Vec::new();
    }
    let mut tail = items.split_off(skip);
    tail.truncate(opts.limit.unwrap_or(usize::MAX).min(MAX_LIMIT));
    tail
}

#[must_use]
pub fn find_one(col: &Arc<Collection>, filter: &Filter) -> Option<Document> {
    let store = col.store.read();
    store.iter().find(|d| filter_matches(&d.data, filter)).cloned()
}

/// `find_one` for callers that demand a match.
///
/// # Errors
/// `NotFound` when no record matches; the only operation that treats a
/// zero-match as an error.
pub fn find_one_required(col: &Arc<Collection>, filter: &Filter) -> Result<Document, DbError> {
    find_one(col, filter).ok_or_else(|| DbError::NotFound(format!("no record matches {filter:?}")))
}

#[must_use]
pub fn count_docs(col: &Arc<Collection>, filter: &Filter) -> usize {
    col.store.read().iter().filter(|d| filter_matches(&d.data, filter)).count()
}

/// Applies `upd` to every record matching `filter`.
///
/// Holds the store's write lock across filter-evaluate-then-mutate, so the
/// summary reflects one consistent snapshot. A record whose application
/// fails is left untouched and reported as matched but not modified.
///
/// # Errors
/// Structural errors (`InvalidUpdate`, `SchemaViolation`) surface before any
/// record is touched.
pub fn update_many(
    col: &Arc<Collection>,
    filter: &Filter,
    upd: &UpdateDoc,
    opts: UpdateOptions,
) -> Result<MutationSummary, DbError> {
    validate_update(upd)?;
    check_schema(col.schema(), upd)?;
    let mut summary = MutationSummary { acknowledged: col.is_acknowledged(), ..Default::default() };
    let mut store = col.store.write();
    let matched: Vec<DocumentId> =
        store.iter().filter(|d| filter_matches(&d.data, filter)).map(|d| d.id.clone()).collect();
    if matched.is_empty() {
        if opts.upsert {
            let doc = insert_upsert(&mut store, col, filter, upd)?;
            summary.upserted_id = Some(doc.id);
        }
        return Ok(summary);
    }
    for id in matched {
        let Some(doc) = store.get_mut(&id) else { continue };
        summary.matched += 1;
        match apply_update(doc, upd) {
            Ok(true) => summary.modified += 1,
            Ok(false) => {}
            Err(e) => log::warn!("update of {id} failed, record left unmodified: {e}"),
        }
    }
    log::debug!(
        "update_many collection={} matched={} modified={}",
        col.name_str(),
        summary.matched,
        summary.modified
    );
    Ok(summary)
}

/// Applies `upd` to at most the first record (in collection iteration order)
/// matching `filter`. Zero matches is a zero summary, not an error.
///
/// # Errors
/// Same structural errors as [`update_many`].
pub fn update_one(
    col: &Arc<Collection>,
    filter: &Filter,
    upd: &UpdateDoc,
    opts: UpdateOptions,
) -> Result<MutationSummary, DbError> {
    validate_update(upd)?;
    check_schema(col.schema(), upd)?;
    let mut summary = MutationSummary { acknowledged: col.is_acknowledged(), ..Default::default() };
    let mut store = col.store.write();
    let first =
        store.iter().find(|d| filter_matches(&d.data, filter)).map(|d| d.id.clone());
    match first {
        Some(id) => {
            let Some(doc) = store.get_mut(&id) else { return Ok(summary) };
            summary.matched = 1;
            match apply_update(doc, upd) {
                Ok(true) => summary.modified = 1,
                Ok(false) => {}
                Err(e) => log::warn!("update of {id} failed, record left unmodified: {e}"),
            }
        }
        None if opts.upsert => {
            let doc = insert_upsert(&mut store, col, filter, upd)?;
            summary.upserted_id = Some(doc.id);
        }
        None => {}
    }
    Ok(summary)
}

/// Atomically (from the caller's perspective) selects one matching record,
/// applies `upd`, and returns the pre-update snapshot, or the post-update
/// one when `return_original` is false.
///
/// # Errors
/// Structural errors fail fast; a per-record application failure propagates
/// here because the caller targeted exactly this record.
pub fn find_one_and_update(
    col: &Arc<Collection>,
    filter: &Filter,
    upd: &UpdateDoc,
    opts: FindAndModifyOptions,
) -> Result<Option<Document>, DbError> {
    validate_update(upd)?;
    check_schema(col.schema(), upd)?;
    let mut store = col.store.write();
    let first =
        store.iter().find(|d| filter_matches(&d.data, filter)).map(|d| d.id.clone());
    let Some(id) = first else {
        if opts.upsert {
            let doc = insert_upsert(&mut store, col, filter, upd)?;
            return Ok(if opts.return_original { None } else { Some(doc) });
        }
        return Ok(None);
    };
    let Some(doc) = store.get_mut(&id) else { return Ok(None) };
    let before = doc.clone();
    apply_update(doc, upd)?;
    Ok(Some(if opts.return_original { before } else { doc.clone() }))
}

/// Total replacement: every field of the matched record except `_id` is
/// discarded and the replacement's fields are written. Contrast with the
/// update family, which merges.
///
/// # Errors
/// `SchemaViolation` in strict mode, `InvalidUpdate` when the replacement
/// carries a conflicting `_id`.
pub fn replace_one(
    col: &Arc<Collection>,
    filter: &Filter,
    replacement: BsonDocument,
    opts: ReplaceOptions,
) -> Result<MutationSummary, DbError> {
    col.schema().check_fields(replacement.keys().map(String::as_str))?;
    let mut summary = MutationSummary { acknowledged: col.is_acknowledged(), ..Default::default() };
    let mut store = col.store.write();
    let first =
        store.iter().find(|d| filter_matches(&d.data, filter)).map(|d| d.id.clone());
    match first {
        Some(id) => {
            let new_data = rebuild_replacement(&id, &replacement)?;
            let Some(doc) = store.get_mut(&id) else { return Ok(summary) };
            summary.matched = 1;
            if doc.data != new_data {
                doc.replace_data(new_data);
                summary.modified = 1;
            }
        }
        None if opts.upsert => {
            let doc = Document::new(replacement)?;
            if store.contains(&doc.id) {
                return Err(DbError::DuplicateId(doc.id.to_string()));
            }
            store.insert(doc.clone());
            summary.upserted_id = Some(doc.id);
        }
        None => {}
    }
    Ok(summary)
}

/// Find-and-modify flavor of [`replace_one`]. Zero matches yields `None`,
/// never a default-constructed record.
///
/// # Errors
/// Same as [`replace_one`].
pub fn find_one_and_replace(
    col: &Arc<Collection>,
    filter: &Filter,
    replacement: BsonDocument,
    opts: FindAndModifyOptions,
) -> Result<Option<Document>, DbError> {
    col.schema().check_fields(replacement.keys().map(String::as_str))?;
    let mut store = col.store.write();
    let first =
        store.iter().find(|d| filter_matches(&d.data, filter)).map(|d| d.id.clone());
    let Some(id) = first else {
        if opts.upsert {
            let doc = Document::new(replacement)?;
            if store.contains(&doc.id) {
                return Err(DbError::DuplicateId(doc.id.to_string()));
            }
            store.insert(doc.clone());
            return Ok(if opts.return_original { None } else { Some(doc) });
        }
        return Ok(None);
    };
    let new_data = rebuild_replacement(&id, &replacement)?;
    let Some(doc) = store.get_mut(&id) else { return Ok(None) };
    let before = doc.clone();
    if doc.data != new_data {
        doc.replace_data(new_data);
    }
    Ok(Some(if opts.return_original { before } else { doc.clone() }))
}

#[must_use]
pub fn delete_many(col: &Arc<Collection>, filter: &Filter) -> DeleteSummary {
    let mut store = col.store.write();
    let matched: Vec<DocumentId> =
        store.iter().filter(|d| filter_matches(&d.data, filter)).map(|d| d.id.clone()).collect();
    let mut deleted = 0u64;
    for id in matched {
        if store.remove(&id).is_some() {
            deleted += 1;
        }
    }
    log::debug!("delete_many collection={} deleted={deleted}", col.name_str());
    DeleteSummary { deleted, acknowledged: col.is_acknowledged() }
}

#[must_use]
pub fn delete_one(col: &Arc<Collection>, filter: &Filter) -> DeleteSummary {
    let mut store = col.store.write();
    let first =
        store.iter().find(|d| filter_matches(&d.data, filter)).map(|d| d.id.clone());
    let deleted = match first {
        Some(id) => u64::from(store.remove(&id).is_some()),
        None => 0,
    };
    DeleteSummary { deleted, acknowledged: col.is_acknowledged() }
}

/// Replacement body with the matched record's own `_id` re-attached.
fn rebuild_replacement(id: &DocumentId, replacement: &BsonDocument) -> Result<BsonDocument, DbError> {
    match replacement.get(ID_FIELD) {
        None => {}
        Some(Bson::String(s)) if *s == id.0 => {}
        Some(_) => {
            return Err(DbError::InvalidUpdate(
                "replacement document cannot change _id".to_string(),
            ));
        }
    }
    Ok(document::body_with_id(id, replacement.clone()))
}

/// Synthesizes and inserts the upsert record: the filter's top-level
/// equality fields plus the update's pairs.
fn insert_upsert(
    store: &mut Store,
    col: &Collection,
    filter: &Filter,
    upd: &UpdateDoc,
) -> Result<Document, DbError> {
    let mut body = BsonDocument::new();
    collect_eq_fields(filter, &mut body);
    match upd {
        UpdateDoc::Set(pairs) => {
            for (k, v) in pairs {
                set_path(&mut body, k, v.clone());
            }
        }
        UpdateDoc::Inc(pairs) => {
            for (k, by) in pairs {
                set_path(&mut body, k, Bson::Double(*by));
            }
        }
        UpdateDoc::Unset(_) => {}
    }
    col.schema().check_fields(body.keys().map(String::as_str))?;
    let doc = Document::new(body)?;
    if store.contains(&doc.id) {
        return Err(DbError::DuplicateId(doc.id.to_string()));
    }
    store.insert(doc.clone());
    log::debug!("upsert inserted id={} into {}", doc.id, col.name_str());
    Ok(doc)
}

fn collect_eq_fields(filter: &Filter, out: &mut BsonDocument) {
    match filter {
        Filter::Cmp { path, op: CmpOp::Eq, value } => {
            set_path(out, path, value.clone());
        }
        Filter::And(fs) => {
            for f in fs {
                collect_eq_fields(f, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionOptions;
    use crate::query::{Order, Projection, SortSpec};
    use bson::doc;

    fn users() -> Arc<Collection> {
        let col = Arc::new(Collection::new("users".to_string(), CollectionOptions::default()));
        col.insert_one(doc! {"name": "Haven", "age": 4}).unwrap();
        col.insert_one(doc! {"name": "Hortense", "age": 8}).unwrap();
        col.insert_one(doc! {"name": "Chick", "age": 20}).unwrap();
        col
    }

    #[test]
    fn find_sorts_then_paginates_then_projects() {
        let col = users();
        let opts = FindOptions {
            projection: Some(Projection::include(["name"]).without_id()),
            sort: Some(vec![SortSpec { field: "age".into(), order: Order::Desc }]),
            limit: Some(2),
            skip: Some(1),
        };
        let docs = find_docs(&col, &Filter::True, &opts).unwrap().to_vec();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].data, doc! {"name": "Hortense"});
        assert_eq!(docs[1].data, doc! {"name": "Haven"});
    }

    #[test]
    fn zero_limit_is_rejected_before_the_scan() {
        let col = users();
        let opts = FindOptions { limit: Some(0), ..Default::default() };
        assert!(matches!(find_docs(&col, &Filter::True, &opts), Err(DbError::InvalidLimit(_))));
    }

    #[test]
    fn upsert_builds_from_filter_equality_and_set_pairs() {
        let col = users();
        let filter = Filter::eq("name", "Dot");
        let upd = UpdateDoc::set([("age", Bson::Int32(2))]);
        let summary =
            update_one(&col, &filter, &upd, UpdateOptions { upsert: true }).unwrap();
        assert_eq!(summary.matched, 0);
        let id = summary.upserted_id.expect("upsert inserts");
        let doc = col.find_document(&id).unwrap();
        assert_eq!(doc.data.get_str("name").unwrap(), "Dot");
        assert_eq!(doc.data.get_i32("age").unwrap(), 2);
    }
}
