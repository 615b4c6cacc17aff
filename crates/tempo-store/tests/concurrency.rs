// Stress the bounded-retry write path: independent stores (one connection
// each) hammering the same database file must not lose a single insert.

use std::collections::BTreeMap;
use std::thread;

use tempo_store::{AttrType, RecordStore, Schema, StoreLocation, Value};

fn schema() -> Schema {
    Schema::new()
        .with_attr("name", AttrType::Text)
        .with_attr("count", AttrType::Integer)
        .with_attr("active", AttrType::Bool)
        .with_attr("rating", AttrType::Real)
}

#[test]
fn concurrent_inserts_from_independent_connections_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contended.db");
    const WRITERS: usize = 8;

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let path = path.clone();
            thread::spawn(move || {
                // Each worker opens its own store, like an independent process
                // would. Init is idempotent and serialized by the file lock.
                let store = RecordStore::open(schema(), StoreLocation::on_disk(path)).unwrap();
                let mut record = BTreeMap::new();
                record.insert("name".to_string(), Value::from(format!("writer{i}")));
                record.insert("count".to_string(), Value::Integer(i as i64));
                record.insert("active".to_string(), Value::Bool(true));
                record.insert("rating".to_string(), Value::Real(i as f64));
                store.insert(&record).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let store = RecordStore::open(schema(), StoreLocation::on_disk(&path)).unwrap();
    let ids = store.find(&BTreeMap::new()).unwrap();
    assert_eq!(ids.len(), WRITERS, "every insert must survive contention");

    let names: std::collections::BTreeSet<String> = ids
        .iter()
        .map(|&id| {
            store
                .get_attr(id, "name")
                .unwrap()
                .as_text()
                .unwrap()
                .to_string()
        })
        .collect();
    let expected: std::collections::BTreeSet<String> =
        (0..WRITERS).map(|i| format!("writer{i}")).collect();
    assert_eq!(names, expected);
}

#[test]
fn one_store_shared_across_threads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let store =
        std::sync::Arc::new(RecordStore::open(schema(), StoreLocation::on_disk(path)).unwrap());
    const WRITERS: usize = 8;

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                let mut record = BTreeMap::new();
                record.insert("name".to_string(), Value::from(format!("thread{i}")));
                record.insert("count".to_string(), Value::Integer(i as i64));
                record.insert("active".to_string(), Value::Bool(false));
                record.insert("rating".to_string(), Value::Real(0.0));
                store.insert(&record).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.find(&BTreeMap::new()).unwrap().len(), WRITERS);
}
