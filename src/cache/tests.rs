use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Notify;

use super::*;
use crate::constants::RATING_CACHE_KEY;
use crate::storage::{KeyValueStore, MemoryStore, StorageResult};

const INTERVAL: Duration = Duration::from_secs(1);

fn create_test_cache() -> (ResultCache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let cache = ResultCache::new(Arc::clone(&store) as _, INTERVAL);
    (cache, store)
}

#[test]
fn test_streaming_entry_requires_a_score() {
    let (cache, _store) = create_test_cache();

    assert!(!cache.upsert_streaming("1", "src", None, "thinking"));
    assert!(cache.lookup("1").is_none());

    assert!(cache.upsert_streaming("1", "src", Some(6), "ok SCORE_6"));
    let entry = cache.lookup("1").expect("entry");
    assert!(entry.streaming);
    assert_eq!(entry.score, 6);
    assert_eq!(entry.timestamp, None);
}

#[test]
fn test_streaming_entry_updates_in_place() {
    let (cache, _store) = create_test_cache();
    cache.upsert_streaming("1", "src", Some(6), "SCORE_6");

    assert!(cache.upsert_streaming("1", "src", None, "SCORE_6 and more"));
    let entry = cache.lookup("1").expect("entry");
    assert_eq!(entry.score, 6);
    assert_eq!(entry.description, "SCORE_6 and more");

    cache.upsert_streaming("1", "src", Some(7), "SCORE_7");
    assert_eq!(cache.lookup("1").expect("entry").score, 7);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_streaming_entry_is_not_final() {
    let (cache, _store) = create_test_cache();
    cache.upsert_streaming("1", "src", Some(6), "SCORE_6");

    assert!(cache.lookup("1").is_some());
    assert!(cache.lookup_final("1").is_none());
}

#[tokio::test]
async fn test_discard_partial_keeps_final_entries() {
    let (cache, _store) = create_test_cache();
    cache.upsert_streaming("s", "src", Some(2), "SCORE_2");
    cache.finalize("f", "src", 9, "SCORE_9").await;

    assert!(cache.discard_partial("s"));
    assert!(!cache.discard_partial("f"));
    assert!(!cache.discard_partial("missing"));
    assert!(cache.lookup("s").is_none());
    assert!(cache.lookup("f").is_some());
}

#[tokio::test]
async fn test_finalize_overwrites_partial_and_persists() {
    let (cache, store) = create_test_cache();
    cache.upsert_streaming("1", "src", Some(6), "SCORE_6");

    let entry = cache.finalize("1", "src", 8, "great SCORE_8").await;

    assert!(!entry.streaming);
    assert!(entry.timestamp.is_some());
    assert_eq!(cache.lookup_final("1"), Some(entry));
    assert_eq!(store.write_count(), 1);
    let persisted = store.peek(RATING_CACHE_KEY).expect("persisted");
    assert_eq!(persisted["1"]["score"], 8);
    assert_eq!(persisted["1"]["sourceContent"], "src");
}

#[tokio::test]
async fn test_final_entry_ignores_streaming_updates() {
    let (cache, _store) = create_test_cache();
    cache.finalize("1", "src", 8, "SCORE_8").await;

    assert!(!cache.upsert_streaming("1", "src", Some(2), "SCORE_2"));
    let entry = cache.lookup("1").expect("entry");
    assert_eq!(entry.score, 8);
    assert!(!entry.streaming);
}

#[tokio::test(start_paused = true)]
async fn test_debounced_persist_writes_once_per_window() {
    let (cache, store) = create_test_cache();
    cache.upsert_streaming("1", "src", Some(3), "SCORE_3");

    assert!(cache.persist_debounced().await);
    assert!(!cache.persist_debounced().await);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!cache.persist_debounced().await);
    assert_eq!(store.write_count(), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(cache.persist_debounced().await);
    assert_eq!(store.write_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_finalize_bypasses_debounce() {
    let (cache, store) = create_test_cache();
    cache.upsert_streaming("1", "src", Some(3), "SCORE_3");
    assert!(cache.persist_debounced().await);

    cache.finalize("1", "src", 3, "SCORE_3").await;
    assert_eq!(store.write_count(), 2);
}

#[tokio::test]
async fn test_persist_failure_does_not_lose_entry() {
    let (cache, store) = create_test_cache();
    store.fail_writes(true);

    cache.finalize("1", "src", 4, "SCORE_4").await;

    assert_eq!(cache.lookup_final("1").map(|e| e.score), Some(4));
    assert!(cache.persist().await.is_err());
}

#[tokio::test]
async fn test_round_trip_through_store() {
    let (cache, store) = create_test_cache();
    cache.finalize("a", "post a", 9, "SCORE_9").await;
    cache.finalize("b", "post b\n[REPLY]\nreply", 2, "meh SCORE_2").await;

    let reloaded = ResultCache::new(Arc::clone(&store) as _, INTERVAL);
    assert_eq!(reloaded.load().await.expect("load"), 2);
    assert_eq!(reloaded.snapshot(), cache.snapshot());
}

#[tokio::test]
async fn test_load_drops_streaming_entries() {
    let store = Arc::new(MemoryStore::with_value(
        RATING_CACHE_KEY,
        json!({
            "done": { "sourceContent": "x", "score": 7, "description": "SCORE_7", "streaming": false, "timestamp": 1 },
            "stale": { "sourceContent": "y", "score": 3, "description": "SCORE_3", "streaming": true },
        }),
    ));
    let cache = ResultCache::new(Arc::clone(&store) as _, INTERVAL);

    assert_eq!(cache.load().await.expect("load"), 1);
    assert!(cache.lookup("done").is_some());
    assert!(cache.lookup("stale").is_none());
}

#[tokio::test]
async fn test_load_from_empty_store() {
    let (cache, _store) = create_test_cache();
    assert_eq!(cache.load().await.expect("load"), 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_clear_notifies_and_persists() {
    let (cache, store) = create_test_cache();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    cache.subscribe(Arc::new(move |change: &CacheChange| {
        sink.lock().push(change.clone())
    }));

    cache.upsert_streaming("1", "src", Some(5), "SCORE_5");
    cache.finalize("1", "src", 5, "SCORE_5").await;
    cache.clear().await.expect("clear");

    assert!(cache.is_empty());
    assert_eq!(store.peek(RATING_CACHE_KEY), Some(json!({})));
    assert_eq!(
        *seen.lock(),
        vec![
            CacheChange::Partial {
                item_id: "1".to_string(),
                score: 5
            },
            CacheChange::Final {
                item_id: "1".to_string(),
                score: 5
            },
            CacheChange::Cleared,
        ]
    );
}

#[tokio::test]
async fn test_stats_count_final_entries() {
    let (cache, _store) = create_test_cache();
    assert_eq!(cache.stats().mean_score, None);

    cache.finalize("a", "a", 8, "SCORE_8").await;
    cache.finalize("b", "b", 4, "SCORE_4").await;
    cache.upsert_streaming("c", "c", Some(1), "SCORE_1");

    let stats = cache.stats();
    assert_eq!(stats.finalized, 2);
    assert_eq!(stats.streaming, 1);
    assert_eq!(stats.mean_score, Some(6.0));
}

/// Store whose next write parks until released.
#[derive(Default)]
struct GatedStore {
    inner: MemoryStore,
    hold_next: AtomicBool,
    parked: AtomicBool,
    release: Notify,
}

#[async_trait]
impl KeyValueStore for GatedStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        if self.hold_next.swap(false, Ordering::SeqCst) {
            self.parked.store(true, Ordering::SeqCst);
            self.release.notified().await;
        }
        self.inner.set(key, value).await
    }
}

#[tokio::test]
async fn test_stale_debounced_write_cannot_overwrite_final() {
    let store = Arc::new(GatedStore::default());
    let cache = Arc::new(ResultCache::new(Arc::clone(&store) as _, Duration::ZERO));
    cache.upsert_streaming("1", "src", Some(3), "partial SCORE_3");

    store.hold_next.store(true, Ordering::SeqCst);
    let debounced = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.persist_debounced().await }
    });
    while !store.parked.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }

    let finalize = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.finalize("1", "src", 8, "final SCORE_8").await }
    });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    store.release.notify_one();

    assert!(debounced.await.expect("join"));
    finalize.await.expect("join");

    let stored = store.inner.peek(RATING_CACHE_KEY).expect("stored");
    assert_eq!(stored["1"]["score"], 8);
    assert_eq!(stored["1"]["streaming"], false);
}
