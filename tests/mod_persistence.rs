use akoko_store::{Collection, Document, DocumentStore, LocalStore, UpdateOptions};
use serde_json::{Value, json};
use std::fs;
use tempfile::tempdir;

fn obj(v: Value) -> Document {
    match v {
        Value::Object(m) => m,
        _ => panic!("expected object"),
    }
}

#[tokio::test]
async fn restart_reproduces_identical_sequence() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let before = {
        let store = LocalStore::open(&data).unwrap();
        let col = store.collection("staff").unwrap();
        col.insert_many(vec![
            obj(json!({"department": "science", "name": "A", "z": 1, "a": 2})),
            obj(json!({"department": "math", "name": "B", "nested": {"x": [1, 2, {"y": null}]}})),
        ])
        .await
        .unwrap();
        col.insert_one(obj(json!({"department": "art", "score": 9.5, "active": false}))).await.unwrap();
        col.update_one(
            &obj(json!({"name": "B"})),
            &json!({"$push": {"subjects": "algebra"}}),
            UpdateOptions::default(),
        )
        .await
        .unwrap();
        col.delete_one(&obj(json!({"name": "A"}))).await.unwrap();
        col.find(&Document::new()).await.unwrap().to_vec()
    };

    let reopened = LocalStore::open(&data).unwrap();
    assert_eq!(reopened.collection_names(), vec!["staff".to_string()]);
    let after = reopened.collection("staff").unwrap().find(&Document::new()).await.unwrap().to_vec();
    assert_eq!(after, before);
    assert_eq!(after[0]["subjects"], json!(["algebra"]));
}

#[tokio::test]
async fn table_file_is_pretty_json_array_named_after_table() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path()).unwrap();
    let col = store.collection("fees").unwrap();
    col.insert_one(obj(json!({"department": "default", "fees": {"term1": 100}}))).await.unwrap();

    let path = dir.path().join("fees.json");
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with('['));
    assert!(text.contains("\n  {"));
    let parsed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, json!([{"department": "default", "fees": {"term1": 100}}]));

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["fees.json".to_string()]);
}

#[tokio::test]
async fn corrupt_table_file_does_not_block_startup() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("staff.json"), "[{\"name\": ").unwrap();
    fs::write(dir.path().join("fees.json"), "[{\"department\": \"default\"}]").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let store = LocalStore::open(dir.path()).unwrap();
    assert_eq!(store.collection_names(), vec!["fees".to_string(), "staff".to_string()]);
    let staff = store.collection("staff").unwrap();
    assert_eq!(staff.count(&Document::new()).await.unwrap(), 0);
    assert!(dir.path().join("staff.json.corrupt").exists());

    staff.insert_one(obj(json!({"name": "fresh"}))).await.unwrap();
    let fees = store.collection("fees").unwrap();
    assert_eq!(fees.count(&Document::new()).await.unwrap(), 1);
    // The corrupt original is kept for inspection.
    assert_eq!(fs::read_to_string(dir.path().join("staff.json.corrupt")).unwrap(), "[{\"name\": ");
}

#[tokio::test]
async fn missing_data_dir_is_created() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("nested").join("data");
    let store = LocalStore::open(&data).unwrap();
    assert!(data.is_dir());
    assert!(store.collection_names().is_empty());
    assert!(store.list_collection_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn unchanged_update_does_not_rewrite_file() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path()).unwrap();
    let col = store.collection("fees").unwrap();
    col.insert_one(obj(json!({"department": "default", "term1": 100}))).await.unwrap();
    let path = dir.path().join("fees.json");
    // Replace the file content out-of-band; a no-op update must not overwrite it.
    fs::write(&path, "[]").unwrap();
    let res = col
        .update_one(&obj(json!({"department": "default"})), &json!({"$set": {"term1": 100}}), UpdateOptions::default())
        .await
        .unwrap();
    assert_eq!(res.modified_count, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
}
