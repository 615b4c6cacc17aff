// Behavioural tests for the record store: encode/decode round-trips,
// validation errors, filtering, and top-N ordering.

use std::collections::BTreeMap;

use serde_json::json;
use tempo_store::{AttrType, RecordStore, Schema, StoreError, StoreLocation, Value};

fn full_schema() -> Schema {
    Schema::new()
        .with_attr("name", AttrType::Text)
        .with_attr("duration", AttrType::Integer)
        .with_attr("rating", AttrType::Real)
        .with_attr("tags", AttrType::Structured)
        .with_attr("flags", AttrType::Structured)
        .with_attr("active", AttrType::Bool)
}

fn record(
    name: &str,
    duration: i64,
    rating: f64,
    tags: serde_json::Value,
    flags: serde_json::Value,
    active: bool,
) -> BTreeMap<String, Value> {
    let mut r = BTreeMap::new();
    r.insert("name".to_string(), Value::from(name));
    r.insert("duration".to_string(), Value::Integer(duration));
    r.insert("rating".to_string(), Value::Real(rating));
    r.insert("tags".to_string(), Value::Structured(tags));
    r.insert("flags".to_string(), Value::Structured(flags));
    r.insert("active".to_string(), Value::Bool(active));
    r
}

/// Five deterministic rows; ids are 1..=5 in insertion order.
fn seeded_store() -> RecordStore {
    let store = RecordStore::open(full_schema(), StoreLocation::InMemory).unwrap();
    let rows = [
        record("A", 10, 1.5, json!(["x"]), json!({}), true),
        record("Carol", 30, 3.5, json!(["x", "y", "z"]), json!({"a": 1}), false),
        record("Bob", 20, 2.5, json!(["x", "y"]), json!({"long": 1}), true),
        record("Eveleen", 40, 0.5, json!([]), json!({"a": [1, 2, 3]}), false),
        record("Dan", 5, 9.9, json!(["x", "y", "z", "w"]), json!({}), true),
    ];
    for row in &rows {
        store.insert(row).unwrap();
    }
    store
}

#[test]
fn insert_then_get_round_trips_every_type() {
    let store = RecordStore::open(full_schema(), StoreLocation::InMemory).unwrap();
    let row = record("t", 7, 2.25, json!([1, "two"]), json!({"k": true}), true);
    let id = store.insert(&row).unwrap();

    for (attr, expected) in &row {
        let got = store.get_attr(id, attr).unwrap();
        assert_eq!(&got, expected, "attribute {attr}");
    }
}

#[test]
fn set_attr_then_get_returns_new_value() {
    let store = seeded_store();
    store.set_attr(1, "name", &Value::from("renamed")).unwrap();
    store.set_attr(1, "active", &Value::Bool(false)).unwrap();
    store
        .set_attr(1, "tags", &Value::Structured(json!(["a", "b"])))
        .unwrap();

    assert_eq!(store.get_attr(1, "name").unwrap(), Value::from("renamed"));
    assert_eq!(store.get_attr(1, "active").unwrap(), Value::Bool(false));
    assert_eq!(
        store.get_attr(1, "tags").unwrap(),
        Value::Structured(json!(["a", "b"]))
    );
}

#[test]
fn remove_makes_record_unreachable() {
    let store = seeded_store();
    store.remove(3).unwrap();

    assert!(matches!(
        store.get_attr(3, "name"),
        Err(StoreError::NotFound { id: 3 })
    ));
    assert!(matches!(
        store.set_attr(3, "name", &Value::from("x")),
        Err(StoreError::NotFound { id: 3 })
    ));
    assert!(matches!(
        store.remove(3),
        Err(StoreError::NotFound { id: 3 })
    ));
    assert_eq!(store.find(&BTreeMap::new()).unwrap(), vec![1, 2, 4, 5]);
}

#[test]
fn insert_rejects_wrong_key_set() {
    let store = seeded_store();

    let mut partial = record("x", 1, 1.0, json!([]), json!({}), true);
    partial.remove("rating");
    let err = store.insert(&partial).unwrap_err();
    match err {
        StoreError::SchemaMismatch { missing, extra } => {
            assert_eq!(missing, vec!["rating".to_string()]);
            assert!(extra.is_empty());
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }

    let mut extra_keys = record("x", 1, 1.0, json!([]), json!({}), true);
    extra_keys.insert("bogus".to_string(), Value::Integer(1));
    let err = store.insert(&extra_keys).unwrap_err();
    match err {
        StoreError::SchemaMismatch { missing, extra } => {
            assert!(missing.is_empty());
            assert_eq!(extra, vec!["bogus".to_string()]);
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
}

#[test]
fn unknown_attribute_is_rejected_everywhere() {
    let store = seeded_store();
    assert!(matches!(
        store.get_attr(1, "nope"),
        Err(StoreError::UnknownAttribute { .. })
    ));
    assert!(matches!(
        store.set_attr(1, "nope", &Value::Integer(1)),
        Err(StoreError::UnknownAttribute { .. })
    ));
    assert!(matches!(
        store.top_n("nope", 3, true, &BTreeMap::new()),
        Err(StoreError::UnknownAttribute { .. })
    ));
}

#[test]
fn type_mismatch_is_rejected() {
    let store = seeded_store();
    let err = store.set_attr(1, "duration", &Value::from("ten")).unwrap_err();
    match err {
        StoreError::TypeMismatch {
            attr,
            expected,
            actual,
        } => {
            assert_eq!(attr, "duration");
            assert_eq!(expected, AttrType::Integer);
            assert_eq!(actual, AttrType::Text);
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[test]
fn find_with_empty_filter_returns_all_ids() {
    let store = seeded_store();
    assert_eq!(store.find(&BTreeMap::new()).unwrap(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn find_filters_on_encoded_representations() {
    let store = seeded_store();

    let mut by_bool = BTreeMap::new();
    by_bool.insert("active".to_string(), Value::Bool(true));
    assert_eq!(store.find(&by_bool).unwrap(), vec![1, 3, 5]);

    // Structured filters compare against the stored JSON text.
    let mut by_json = BTreeMap::new();
    by_json.insert("flags".to_string(), Value::Structured(json!({})));
    assert_eq!(store.find(&by_json).unwrap(), vec![1, 5]);

    // Conjunction of two attributes.
    let mut both = BTreeMap::new();
    both.insert("active".to_string(), Value::Bool(true));
    both.insert("duration".to_string(), Value::Integer(10));
    assert_eq!(store.find(&both).unwrap(), vec![1]);

    // No match yields an empty set, not an error.
    let mut none = BTreeMap::new();
    none.insert("name".to_string(), Value::from("missing"));
    assert!(store.find(&none).unwrap().is_empty());
}

#[test]
fn top_n_integer_by_value() {
    let store = seeded_store();
    // duration: 10(1), 30(2), 20(3), 40(4), 5(5)
    assert_eq!(
        store.top_n("duration", 3, true, &BTreeMap::new()).unwrap(),
        vec![4, 2, 3]
    );
    assert_eq!(
        store.top_n("duration", 2, false, &BTreeMap::new()).unwrap(),
        vec![5, 1]
    );
}

#[test]
fn top_n_real_by_value() {
    let store = seeded_store();
    // rating: 1.5(1), 3.5(2), 2.5(3), 0.5(4), 9.9(5)
    assert_eq!(
        store.top_n("rating", 2, true, &BTreeMap::new()).unwrap(),
        vec![5, 2]
    );
}

#[test]
fn top_n_text_by_stored_length() {
    let store = seeded_store();
    // name lengths: A=1(1), Carol=5(2), Bob=3(3), Eveleen=7(4), Dan=3(5)
    assert_eq!(
        store.top_n("name", 2, true, &BTreeMap::new()).unwrap(),
        vec![4, 2]
    );
}

#[test]
fn top_n_structured_by_stored_length() {
    let store = seeded_store();
    // tags JSON lengths: ["x"](1) < ["x","y"](3) < ["x","y","z"](2) < ...
    // ascending by length: [](4), ["x"](1), ["x","y"](3)
    assert_eq!(
        store.top_n("tags", 3, false, &BTreeMap::new()).unwrap(),
        vec![4, 1, 3]
    );
    // flags JSON lengths: {}=2(1), {"a":1}=7(2), {"long":1}=10(3),
    // {"a":[1,2,3]}=13(4), {}=2(5)
    assert_eq!(
        store.top_n("flags", 2, true, &BTreeMap::new()).unwrap(),
        vec![4, 3]
    );
}

#[test]
fn top_n_limit_beyond_rows_returns_everything_in_order() {
    let store = seeded_store();
    assert_eq!(
        store.top_n("duration", 10, true, &BTreeMap::new()).unwrap(),
        vec![4, 2, 3, 1, 5]
    );
}

#[test]
fn top_n_tie_breaks_toward_lower_id() {
    let store = seeded_store();
    // flags {} appears for ids 1 and 5 (equal stored length).
    assert_eq!(
        store.top_n("flags", 5, false, &BTreeMap::new()).unwrap(),
        vec![1, 5, 2, 3, 4]
    );
}

#[test]
fn top_n_rejects_boolean_attributes() {
    let store = seeded_store();
    assert!(matches!(
        store.top_n("active", 2, true, &BTreeMap::new()),
        Err(StoreError::UnsupportedSortType { .. })
    ));
}

#[test]
fn top_n_respects_filter() {
    let store = seeded_store();
    let mut filter = BTreeMap::new();
    filter.insert("active".to_string(), Value::Bool(true));
    // among ids 1, 3, 5: duration 10, 20, 5
    assert_eq!(store.top_n("duration", 2, true, &filter).unwrap(), vec![3, 1]);
}

#[test]
fn invalid_schema_is_rejected_at_open() {
    assert!(matches!(
        RecordStore::open(Schema::new(), StoreLocation::InMemory),
        Err(StoreError::InvalidSchema(_))
    ));
    assert!(matches!(
        RecordStore::open(
            Schema::new().with_attr("id", AttrType::Integer),
            StoreLocation::InMemory
        ),
        Err(StoreError::InvalidSchema(_))
    ));
}

#[test]
fn open_is_idempotent_on_disk_and_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");

    let first = RecordStore::open(full_schema(), StoreLocation::on_disk(&path)).unwrap();
    let id = first
        .insert(&record("persisted", 1, 1.0, json!([]), json!({}), true))
        .unwrap();
    drop(first);

    let second = RecordStore::open(full_schema(), StoreLocation::on_disk(&path)).unwrap();
    assert_eq!(
        second.get_attr(id, "name").unwrap(),
        Value::from("persisted")
    );
}

#[test]
fn get_record_returns_the_whole_row() {
    let store = seeded_store();
    let row = store.get_record(2).unwrap();
    assert_eq!(row.get("name"), Some(&Value::from("Carol")));
    assert_eq!(row.get("duration"), Some(&Value::Integer(30)));
    assert_eq!(row.get("active"), Some(&Value::Bool(false)));
    assert_eq!(row.len(), 6);

    assert!(matches!(
        store.get_record(99),
        Err(StoreError::NotFound { id: 99 })
    ));
}
