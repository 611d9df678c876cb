use akoko_store::query::{UpdateSpec, apply_update, element_matches, matches, upsert_seed};
use akoko_store::{Document, LocalStore, UpdateOptions};
use proptest::prelude::*;
use serde_json::{Value, json};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(|i| json!(i)),
        "[a-z]{0,6}".prop_map(Value::String),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

fn flat_doc() -> impl Strategy<Value = Document> {
    prop::collection::btree_map("[a-e]{1,3}", scalar(), 0..6)
        .prop_map(|m| m.into_iter().collect::<Document>())
}

fn member() -> impl Strategy<Value = Value> {
    (0u8..4, "[xy]").prop_map(|(id, tag)| json!({"id": id, "tag": tag}))
}

proptest! {
    #[test]
    fn push_appends_to_prior_sequence(
        prior in prop::collection::vec(scalar(), 0..8),
        pushed in scalar(),
        absent in any::<bool>(),
    ) {
        let mut doc = Document::new();
        if !absent {
            doc.insert("f".into(), Value::Array(prior.clone()));
        }
        let spec = UpdateSpec::parse(&json!({"$push": {"f": pushed.clone()}})).unwrap();
        apply_update(&mut doc, &spec).unwrap();
        let mut expected = if absent { Vec::new() } else { prior };
        expected.push(pushed);
        prop_assert_eq!(&doc["f"], &Value::Array(expected));
    }

    #[test]
    fn pull_removes_all_matches_and_keeps_order(
        items in prop::collection::vec(member(), 0..12),
        id in 0u8..4,
    ) {
        let cond = json!({"id": id});
        let mut doc = Document::new();
        doc.insert("members".into(), Value::Array(items.clone()));
        let spec = UpdateSpec::parse(&json!({"$pull": {"members": cond.clone()}})).unwrap();
        apply_update(&mut doc, &spec).unwrap();
        let after = doc["members"].as_array().unwrap().clone();
        prop_assert!(after.iter().all(|e| !element_matches(e, &cond)));
        let expected: Vec<Value> = items.into_iter().filter(|e| !element_matches(e, &cond)).collect();
        prop_assert_eq!(after, expected);
    }

    #[test]
    fn upsert_seed_is_union_of_query_and_set(q in flat_doc(), s in flat_doc()) {
        let spec = UpdateSpec::parse(&json!({"$set": Value::Object(s.clone())})).unwrap();
        let seed = upsert_seed(&q, &spec).unwrap();
        prop_assert!(matches(&seed, &s));
        for (k, v) in &q {
            if !s.contains_key(k) {
                prop_assert_eq!(seed.get(k), Some(v));
            }
        }
        prop_assert!(seed.keys().all(|k| q.contains_key(k) || s.contains_key(k)));
    }

    #[test]
    fn inserted_document_is_found_by_its_own_fields(docs in prop::collection::vec(flat_doc(), 1..6)) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let col = store.local_collection("prop").unwrap();
        for d in &docs {
            col.insert_document(d.clone()).unwrap();
        }
        for d in &docs {
            let found = col.find_first(d).unwrap();
            prop_assert!(matches(&found, d));
        }
        let last = docs.last().unwrap();
        let all = col.find_all(last);
        prop_assert!(all.iter().any(|f| f == last));
    }

    #[test]
    fn delete_twice_second_is_zero(docs in prop::collection::vec(flat_doc(), 0..6), probe in flat_doc()) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let col = store.local_collection("prop").unwrap();
        col.insert_documents(docs).unwrap();
        while col.delete_first(&probe).unwrap().deleted_count == 1 {}
        prop_assert_eq!(col.delete_first(&probe).unwrap().deleted_count, 0);
        prop_assert_eq!(col.count_matching(&probe), 0);
        let res = col.update_first(&probe, &json!({"$set": {"seen": true}}), UpdateOptions::default()).unwrap();
        prop_assert_eq!(res.matched_count, 0);
    }
}
