use bson::{Bson, doc};
use doclite::collection::{Collection, CollectionOptions};
use doclite::errors::DbError;
use doclite::query::{
    Filter, FindAndModifyOptions, UpdateDoc, UpdateOptions,
};
use doclite::schema::Schema;
use std::sync::Arc;

fn users() -> Arc<Collection> {
    let col = Arc::new(Collection::new("users".to_string(), CollectionOptions::default()));
    col.insert_one(doc! {"name": "Haven", "age": 4}).unwrap();
    col.insert_one(doc! {"name": "Hortense", "age": 8}).unwrap();
    col.insert_one(doc! {"name": "Chick", "age": 20}).unwrap();
    col
}

#[test]
fn update_one_reports_matched_and_modified() {
    let col = users();
    let summary = col
        .update_one(
            &Filter::eq("name", "Hortense"),
            &UpdateDoc::set([("age", Bson::Int32(9))]),
            UpdateOptions::default(),
        )
        .unwrap();
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.modified, 1);
    assert!(summary.acknowledged);
    assert!(summary.upserted_id.is_none());
    let d = col.find_one(&Filter::eq("name", "Hortense")).unwrap();
    assert_eq!(d.data.get_i32("age").unwrap(), 9);
}

#[test]
fn update_one_zero_match_is_a_zero_summary_not_an_error() {
    let col = users();
    let summary = col
        .update_one(
            &Filter::eq("name", "Nobody"),
            &UpdateDoc::set([("age", Bson::Int32(1))]),
            UpdateOptions::default(),
        )
        .unwrap();
    assert_eq!(summary.matched, 0);
    assert_eq!(summary.modified, 0);
}

#[test]
fn update_many_applies_to_every_match() {
    let col = users();
    let summary = col
        .update_many(
            &Filter::cmp("age", doclite::query::CmpOp::Lt, 21),
            &UpdateDoc::set([("minor", Bson::Boolean(true))]),
            UpdateOptions::default(),
        )
        .unwrap();
    assert_eq!(summary.matched, 3);
    assert_eq!(summary.modified, 3);
    assert_eq!(col.count(&Filter::eq("minor", true)), 3);
}

#[test]
fn set_twice_equals_set_once() {
    let col = users();
    let upd = UpdateDoc::set([("age", Bson::Int32(9))]);
    col.update_one(&Filter::eq("name", "Hortense"), &upd, UpdateOptions::default()).unwrap();
    let once = col.find_one(&Filter::eq("name", "Hortense")).unwrap();
    let summary =
        col.update_one(&Filter::eq("name", "Hortense"), &upd, UpdateOptions::default()).unwrap();
    // Second application matches but changes nothing.
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.modified, 0);
    let twice = col.find_one(&Filter::eq("name", "Hortense")).unwrap();
    assert_eq!(once.data, twice.data);
}

#[test]
fn per_record_failure_reports_partial_success() {
    let col = Arc::new(Collection::new("users".to_string(), CollectionOptions::default()));
    col.insert_one(doc! {"name": "a", "score": 1}).unwrap();
    col.insert_one(doc! {"name": "b", "score": "high"}).unwrap();
    let summary = col
        .update_many(
            &Filter::exists("score"),
            &UpdateDoc::Inc(vec![("score".to_string(), 1.0)]),
            UpdateOptions::default(),
        )
        .unwrap();
    // Both matched; the non-numeric record failed and was left untouched.
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.modified, 1);
    let b = col.find_one(&Filter::eq("name", "b")).unwrap();
    assert_eq!(b.data.get_str("score").unwrap(), "high");
}

#[test]
fn strict_schema_rejects_undeclared_fields_before_any_write() {
    let options = CollectionOptions {
        schema: Schema::strict(["name", "email", "gender", "age"]),
        ..Default::default()
    };
    let col = Arc::new(Collection::new("users".to_string(), options));
    col.insert_one(doc! {"name": "Haven", "age": 4}).unwrap();
    col.insert_one(doc! {"name": "Chick", "age": 20}).unwrap();
    let err = col.update_many(
        &Filter::True,
        &UpdateDoc::set([("nickname", Bson::String("x".into()))]),
        UpdateOptions::default(),
    );
    assert!(matches!(err, Err(DbError::SchemaViolation(_))));
    // Fail fast: nothing was touched.
    assert_eq!(col.count(&Filter::exists("nickname")), 0);
    // Declared fields still update fine.
    let ok = col
        .update_one(
            &Filter::eq("name", "Haven"),
            &UpdateDoc::set([("email", Bson::String("h@example.com".into()))]),
            UpdateOptions::default(),
        )
        .unwrap();
    assert_eq!(ok.modified, 1);
}

#[test]
fn id_is_immutable() {
    let col = users();
    let err = col.update_one(
        &Filter::eq("name", "Haven"),
        &UpdateDoc::set([("_id", Bson::String("forged".into()))]),
        UpdateOptions::default(),
    );
    assert!(matches!(err, Err(DbError::InvalidUpdate(_))));
}

#[test]
fn find_one_and_update_returns_the_pre_image_by_default() {
    let col = users();
    let before = col
        .find_one_and_update(
            &Filter::eq("name", "Hortense"),
            &UpdateDoc::set([("age", Bson::Int32(9))]),
            FindAndModifyOptions::default(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(before.data.get_i32("age").unwrap(), 8);
    assert_eq!(
        col.find_one(&Filter::eq("name", "Hortense")).unwrap().data.get_i32("age").unwrap(),
        9
    );
}

#[test]
fn find_one_and_update_can_return_the_post_image() {
    let col = users();
    let after = col
        .find_one_and_update(
            &Filter::eq("name", "Hortense"),
            &UpdateDoc::set([("age", Bson::Int32(9))]),
            FindAndModifyOptions::default().returning_new(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(after.data.get_i32("age").unwrap(), 9);
}

#[test]
fn find_one_and_update_zero_match_is_none() {
    let col = users();
    let got = col
        .find_one_and_update(
            &Filter::eq("name", "Nobody"),
            &UpdateDoc::set([("age", Bson::Int32(1))]),
            FindAndModifyOptions::default(),
        )
        .unwrap();
    assert!(got.is_none());
}

#[test]
fn upsert_reports_the_new_identity() {
    let col = users();
    let summary = col
        .update_one(
            &Filter::eq("name", "Dot"),
            &UpdateDoc::set([("age", Bson::Int32(2))]),
            UpdateOptions { upsert: true },
        )
        .unwrap();
    assert_eq!(summary.matched, 0);
    assert_eq!(summary.modified, 0);
    let id = summary.upserted_id.expect("upsert inserted a record");
    let d = col.find_document(&id).unwrap();
    assert_eq!(d.data.get_str("name").unwrap(), "Dot");
    assert_eq!(d.data.get_i32("age").unwrap(), 2);
}

#[test]
fn empty_update_spec_is_rejected() {
    let col = users();
    let err = col.update_one(&Filter::True, &UpdateDoc::Set(vec![]), UpdateOptions::default());
    assert!(matches!(err, Err(DbError::InvalidUpdate(_))));
}

#[test]
fn unset_removes_fields_and_updates_bump_updated_at() {
    let col = users();
    let before = col.find_one(&Filter::eq("name", "Haven")).unwrap();
    let summary = col
        .update_one(
            &Filter::eq("name", "Haven"),
            &UpdateDoc::Unset(vec!["age".to_string()]),
            UpdateOptions::default(),
        )
        .unwrap();
    assert_eq!(summary.modified, 1);
    let after = col.find_one(&Filter::eq("name", "Haven")).unwrap();
    assert!(!after.data.contains_key("age"));
    assert!(after.metadata.updated_at >= before.metadata.updated_at);
    assert_eq!(after.metadata.created_at, before.metadata.created_at);
}
