use bson::doc;
use doclite::collection::{Collection, CollectionOptions};
use doclite::errors::DbError;
use doclite::query::{CmpOp, Filter, Projection, SortSpec};
use std::sync::Arc;

fn users() -> Arc<Collection> {
    let col = Arc::new(Collection::new("users".to_string(), CollectionOptions::default()));
    col.insert_one(doc! {"name": "Haven", "age": 4}).unwrap();
    col.insert_one(doc! {"name": "Hortense", "age": 8}).unwrap();
    col.insert_one(doc! {"name": "Chick", "age": 20}).unwrap();
    col
}

#[test]
fn find_under_21_returns_all_three() {
    let col = users();
    let docs = col.find(Filter::cmp("age", CmpOp::Lt, 21)).to_vec().unwrap();
    assert_eq!(docs.len(), 3);
}

#[test]
fn projected_sort_descending_matches_expected_sequence() {
    let col = users();
    let docs = col
        .find(Filter::True)
        .projection(Projection::include(["name", "age"]).without_id())
        .sort(vec![SortSpec::desc("age")])
        .to_vec()
        .unwrap();
    let bodies: Vec<_> = docs.into_iter().map(|d| d.data).collect();
    assert_eq!(
        bodies,
        vec![
            doc! {"name": "Chick", "age": 20},
            doc! {"name": "Hortense", "age": 8},
            doc! {"name": "Haven", "age": 4},
        ]
    );
}

#[test]
fn exclusive_projection_drops_only_listed_fields() {
    let col = Arc::new(Collection::new("users".to_string(), CollectionOptions::default()));
    col.insert_one(doc! {"name": "Hortense", "email": "h@example.com", "gender": "Female", "age": 8})
        .unwrap();
    let docs = col
        .find(Filter::eq("name", "Hortense"))
        .projection(Projection::exclude(["email", "gender"]).without_id())
        .to_vec()
        .unwrap();
    assert_eq!(docs[0].data, doc! {"name": "Hortense", "age": 8});
}

#[test]
fn inclusive_and_exclusive_complements_partition_the_fields() {
    let col = Arc::new(Collection::new("users".to_string(), CollectionOptions::default()));
    let d = col
        .insert_one(doc! {"name": "Hortense", "email": "h@example.com", "age": 8})
        .unwrap();
    let inc = Projection::include(["name", "age"]).without_id();
    let exc = Projection::exclude(["name", "age"]);
    let kept = inc.plan().unwrap().apply(&d.data);
    let dropped = exc.plan().unwrap().apply(&d.data);
    let mut all: Vec<String> = kept.keys().chain(dropped.keys()).cloned().collect();
    all.sort();
    let mut expect: Vec<String> = d.data.keys().cloned().collect();
    expect.sort();
    assert_eq!(all, expect);
    assert!(kept.keys().all(|k| !dropped.contains_key(k)));
}

#[test]
fn mixed_projection_fails_before_any_record_is_scanned() {
    let col = users();
    let bad = Projection {
        fields: vec![("name".to_string(), true), ("age".to_string(), false)],
    };
    let err = col.find(Filter::True).projection(bad).execute();
    assert!(matches!(err, Err(DbError::InvalidProjection(_))));
}

#[test]
fn multi_key_sort_is_stable_across_runs() {
    let col = Arc::new(Collection::new("users".to_string(), CollectionOptions::default()));
    col.insert_one(doc! {"name": "a", "age": 8, "tag": 1}).unwrap();
    col.insert_one(doc! {"name": "b", "age": 8, "tag": 2}).unwrap();
    col.insert_one(doc! {"name": "c", "age": 4, "tag": 3}).unwrap();
    col.insert_one(doc! {"name": "d", "age": 8, "tag": 4}).unwrap();
    let mut last: Option<Vec<i32>> = None;
    for _ in 0..3 {
        let docs = col
            .find(Filter::True)
            .sort(vec![SortSpec::asc("age")])
            .to_vec()
            .unwrap();
        let tags: Vec<i32> = docs.iter().map(|d| d.data.get_i32("tag").unwrap()).collect();
        // Ties on age keep their insertion order.
        assert_eq!(tags, vec![3, 1, 2, 4]);
        if let Some(prev) = &last {
            assert_eq!(prev, &tags);
        }
        last = Some(tags);
    }
}

#[test]
fn missing_sort_field_orders_first_ascending() {
    let col = Arc::new(Collection::new("users".to_string(), CollectionOptions::default()));
    col.insert_one(doc! {"name": "aged", "age": 4}).unwrap();
    col.insert_one(doc! {"name": "ageless"}).unwrap();
    let docs = col.find(Filter::True).sort(vec![SortSpec::asc("age")]).to_vec().unwrap();
    assert_eq!(docs[0].data.get_str("name").unwrap(), "ageless");
    let docs = col.find(Filter::True).sort(vec![SortSpec::desc("age")]).to_vec().unwrap();
    assert_eq!(docs[0].data.get_str("name").unwrap(), "aged");
}

#[test]
fn skip_past_the_end_is_empty_not_an_error() {
    let col = users();
    let docs = col.find(Filter::True).skip(10).to_vec().unwrap();
    assert!(docs.is_empty());
}

#[test]
fn zero_limit_is_a_usage_error() {
    let col = users();
    assert!(matches!(
        col.find(Filter::True).limit(0).execute(),
        Err(DbError::InvalidLimit(_))
    ));
}

#[test]
fn pagination_reconstructs_the_sorted_sequence() {
    let col = Arc::new(Collection::new("n".to_string(), CollectionOptions::default()));
    for i in 0..7i32 {
        col.insert_one(doc! {"i": i}).unwrap();
    }
    let sort = vec![SortSpec::asc("i")];
    let whole = col.find(Filter::True).sort(sort.clone()).to_vec().unwrap();
    for n in 1..7usize {
        let head = col.find(Filter::True).sort(sort.clone()).limit(n).to_vec().unwrap();
        let tail = col.find(Filter::True).sort(sort.clone()).skip(n).to_vec().unwrap();
        assert_eq!(head.len(), n);
        assert_eq!(tail.len(), 7 - n);
        let joined: Vec<i32> = head
            .iter()
            .chain(tail.iter())
            .map(|d| d.data.get_i32("i").unwrap())
            .collect();
        let expect: Vec<i32> = whole.iter().map(|d| d.data.get_i32("i").unwrap()).collect();
        assert_eq!(joined, expect);
    }
}

#[test]
fn cursor_is_lazy_and_skips_records_deleted_mid_iteration() {
    let col = users();
    let mut cur = col.find(Filter::True).execute().unwrap();
    let first = cur.advance().unwrap();
    assert_eq!(first.data.get_str("name").unwrap(), "Haven");
    // Delete the next record before the cursor reaches it.
    let hortense = col.find_one(&Filter::eq("name", "Hortense")).unwrap();
    assert!(col.delete_document(&hortense.id));
    let rest: Vec<_> = cur.collect();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].data.get_str("name").unwrap(), "Chick");
}

#[test]
fn find_one_required_errors_only_on_zero_match() {
    let col = users();
    assert!(col.find_one_required(&Filter::eq("name", "Haven")).is_ok());
    assert!(matches!(
        col.find_one_required(&Filter::eq("name", "Nobody")),
        Err(DbError::NotFound(_))
    ));
    // Plain find_one treats zero matches as a legitimate none.
    assert!(col.find_one(&Filter::eq("name", "Nobody")).is_none());
}
