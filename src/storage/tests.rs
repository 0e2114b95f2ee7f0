use serde_json::json;
use tempfile::TempDir;

use super::*;

fn create_test_store() -> (FileStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = FileStore::new(dir.path().join("nested").join("store.json"));
    (store, dir)
}

#[tokio::test]
async fn test_missing_file_reads_as_empty() {
    let (store, _dir) = create_test_store();

    assert_eq!(store.get("anything").await.expect("get"), None);
    assert_eq!(
        store.get_or("anything", json!({})).await.expect("get_or"),
        json!({})
    );
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_set_then_get() {
    let (store, _dir) = create_test_store();

    store
        .set("rating_cache", json!({"1": {"score": 7}}))
        .await
        .expect("set");

    assert_eq!(
        store.get("rating_cache").await.expect("get"),
        Some(json!({"1": {"score": 7}}))
    );
    assert!(store.path().exists());
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let (store, _dir) = create_test_store();
    store.set("a", json!(1)).await.expect("set a");
    store.set("b", json!("two")).await.expect("set b");

    let reopened = FileStore::new(store.path());
    assert_eq!(reopened.get("a").await.expect("get"), Some(json!(1)));
    assert_eq!(reopened.get("b").await.expect("get"), Some(json!("two")));
}

#[tokio::test]
async fn test_overwrite_replaces_value() {
    let (store, _dir) = create_test_store();
    store.set("k", json!([1, 2])).await.expect("set");
    store.set("k", json!([3])).await.expect("set");

    let reopened = FileStore::new(store.path());
    assert_eq!(reopened.get("k").await.expect("get"), Some(json!([3])));
}

#[tokio::test]
async fn test_no_temp_files_left_behind() {
    let (store, _dir) = create_test_store();
    store.set("k", json!(true)).await.expect("set");
    store.set("k", json!(false)).await.expect("set");

    let parent = store.path().parent().expect("parent");
    let files: Vec<_> = std::fs::read_dir(parent)
        .expect("read_dir")
        .filter_map(Result::ok)
        .collect();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_non_object_file_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("store.json");
    std::fs::write(&path, "[1,2,3]").expect("write");

    let store = FileStore::new(&path);
    let err = store.get("k").await.expect_err("should fail");
    assert!(matches!(err, StorageError::NotAnObject { .. }));
}

#[tokio::test]
async fn test_corrupt_file_is_a_serialization_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{not json").expect("write");

    let store = FileStore::new(&path);
    let err = store.get("k").await.expect_err("should fail");
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[tokio::test]
async fn test_memory_store_counts_and_fails_writes() {
    let store = MemoryStore::new();
    store.set("k", json!(1)).await.expect("set");
    assert_eq!(store.write_count(), 1);

    store.fail_writes(true);
    assert!(store.set("k", json!(2)).await.is_err());
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.peek("k"), Some(json!(1)));
}
