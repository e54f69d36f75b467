#![cfg(feature = "file")]

use docshelf::{file::JsonFileStore, prelude::*};
use serde_json::{Value, json};
use std::path::Path;
use tempfile::tempdir;

async fn open_file_backed(registry: &CollectionRegistry, name: &str, directory: &Path) -> Collection {
    let collection = registry
        .create_or_replace(
            name,
            CollectionConfig::builder()
                .persistence(JsonFileStore::builder(directory))
                .build(),
        )
        .await
        .unwrap();
    collection.ready().await.unwrap();
    collection
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_new_collection_creates_placeholder() {
    let dir = tempdir().unwrap();
    let registry = CollectionRegistry::new();

    let users = open_file_backed(&registry, "users", &dir.path().join("data")).await;
    assert!(users.is_persistent());
    assert_eq!(users.count().await, 0);
    assert_eq!(read_json(&dir.path().join("data").join("users.json")), json!({}));
}

#[tokio::test]
async fn test_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.json");

    {
        let registry = CollectionRegistry::new();
        let users = open_file_backed(&registry, "users", dir.path()).await;
        users
            .insert(json!([
                { "_id": 0, "first_name": "John", "last_name": "Doe" },
                { "_id": 1, "first_name": "Jane", "last_name": "Doe" }
            ]))
            .await
            .unwrap();
        users
            .update(json!({ "_id": 1 }), json!({ "last_name": "Smith" }), UpdateOptions::default())
            .await
            .unwrap();
        users.sync().await;

        let persisted = read_json(&path);
        assert_eq!(persisted.as_array().map(Vec::len), Some(2));
        assert_eq!(persisted[1]["last_name"], json!("Smith"));
    }

    let registry = CollectionRegistry::new();
    let users = open_file_backed(&registry, "users", dir.path()).await;
    assert_eq!(users.ids().await, vec![DocumentId::Int(0), DocumentId::Int(1)]);
    let jane = users.get(&DocumentId::Int(1)).await.unwrap();
    assert_eq!(jane.get("last_name"), Some(&json!("Smith")));
    assert!(jane.created_at().is_some());

    let stats = users.stats().await.unwrap();
    assert!(matches!(stats, CollectionStats::OnDisk(_)));
    assert_eq!(stats.size(), std::fs::metadata(&path).unwrap().len());
}

#[tokio::test]
async fn test_last_mutation_is_last_write() {
    let dir = tempdir().unwrap();
    let registry = CollectionRegistry::new();
    let counters = open_file_backed(&registry, "counters", dir.path()).await;

    for n in 0..50 {
        counters
            .update(json!({ "_id": "hits" }), json!({ "n": n }), UpdateOptions::upsert())
            .await
            .unwrap();
    }
    assert!(!counters.delete_one(json!({ "_id": "missing" })).await);
    counters.sync().await;

    let persisted = read_json(&dir.path().join("counters.json"));
    assert_eq!(persisted[0]["n"], json!(49));
}

#[tokio::test]
async fn test_file_name_override() {
    let dir = tempdir().unwrap();
    let registry = CollectionRegistry::new();

    let users = registry
        .create_or_replace(
            "users",
            CollectionConfig::builder()
                .persistence(JsonFileStore::builder(dir.path()).file_name("people"))
                .build(),
        )
        .await
        .unwrap();
    users.ready().await.unwrap();
    users.insert(json!({ "_id": "a" })).await.unwrap();
    users.sync().await;

    assert!(dir.path().join("people.json").exists());
    assert!(!dir.path().join("users.json").exists());
}

#[tokio::test]
async fn test_corrupt_file_fails_hydration_and_is_left_alone() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.json");
    std::fs::write(&path, r#"{"not":"an array"}"#).unwrap();

    let registry = CollectionRegistry::new();
    let users = registry
        .create_or_replace(
            "users",
            CollectionConfig::builder()
                .persistence(JsonFileStore::builder(dir.path()))
                .build(),
        )
        .await
        .unwrap();

    assert!(matches!(
        users.ready().await,
        Err(DocumentStoreError::Serialization(_))
    ));

    // The collection keeps working in memory.
    users.insert(json!({ "_id": 1 })).await.unwrap();
    users.sync().await;
    assert_eq!(users.count().await, 1);
    assert_eq!(read_json(&path), json!({ "not": "an array" }));
}

#[tokio::test]
async fn test_rename_keeps_file_location() {
    let dir = tempdir().unwrap();
    let registry = CollectionRegistry::new();
    let users = open_file_backed(&registry, "users", dir.path()).await;

    users.rename_collection("people").await.unwrap();
    users.insert(json!({ "_id": 1 })).await.unwrap();
    users.sync().await;

    let persisted = read_json(&dir.path().join("users.json"));
    assert_eq!(persisted[0]["_id"], json!(1));
    assert!(!dir.path().join("people.json").exists());
}

#[tokio::test]
async fn test_write_before_ready_keeps_file_contents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.json");
    std::fs::write(&path, r#"[{"_id":"a"},{"_id":"b"}]"#).unwrap();

    let registry = CollectionRegistry::new();
    let users = registry
        .create_or_replace(
            "users",
            CollectionConfig::builder()
                .persistence(JsonFileStore::builder(dir.path()))
                .build(),
        )
        .await
        .unwrap();

    users.insert(json!({ "_id": "c" })).await.unwrap();
    users.ready().await.unwrap();
    users.sync().await;

    assert_eq!(users.count().await, 3);
    let persisted = read_json(&path);
    let ids: Vec<&Value> = persisted
        .as_array()
        .unwrap()
        .iter()
        .map(|document| &document["_id"])
        .collect();
    assert_eq!(ids, vec![&json!("a"), &json!("b"), &json!("c")]);
}
