use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::entry::{CacheChange, CacheEntry, CacheStats};
use crate::constants::RATING_CACHE_KEY;
use crate::item::ItemId;
use crate::storage::{KeyValueStore, StorageResult};

/// Callback invoked after every cache mutation.
pub type CacheObserver = Arc<dyn Fn(&CacheChange) + Send + Sync>;

/// Ratings keyed by item id, persisted as one JSON object under
/// [`RATING_CACHE_KEY`].
///
/// Streaming updates should go through [`persist_debounced`](Self::persist_debounced),
/// which writes at most once per `persist_interval`. [`finalize`](Self::finalize)
/// always writes.
pub struct ResultCache {
    entries: RwLock<HashMap<ItemId, CacheEntry>>,
    store: Arc<dyn KeyValueStore>,
    persist_interval: Duration,
    last_persist: Mutex<Option<Instant>>,
    /// Held from snapshot to store write so writes land in snapshot order.
    write_order: tokio::sync::Mutex<()>,
    observers: RwLock<Vec<CacheObserver>>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.entries.read().len())
            .field("persist_interval", &self.persist_interval)
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>, persist_interval: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store,
            persist_interval,
            last_persist: Mutex::new(None),
            write_order: tokio::sync::Mutex::new(()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Any entry for `item_id`, streaming or final.
    pub fn lookup(&self, item_id: &str) -> Option<CacheEntry> {
        self.entries.read().get(item_id).cloned()
    }

    /// The entry for `item_id` only if it has been finalised.
    pub fn lookup_final(&self, item_id: &str) -> Option<CacheEntry> {
        self.entries
            .read()
            .get(item_id)
            .filter(|e| e.is_final())
            .cloned()
    }

    /// Records progress of a streaming attempt.
    ///
    /// Creates the entry only once a score is known. Updates an existing
    /// streaming entry in place, keeping its previous score when
    /// `partial_score` is `None`. Never touches a finalised entry. Returns
    /// whether anything was written.
    pub fn upsert_streaming(
        &self,
        item_id: &str,
        source_content: &str,
        partial_score: Option<u32>,
        partial_text: &str,
    ) -> bool {
        let change = {
            let mut entries = self.entries.write();
            match entries.get_mut(item_id) {
                Some(entry) if entry.is_final() => return false,
                Some(entry) => {
                    if let Some(score) = partial_score {
                        entry.score = score;
                    }
                    entry.description = partial_text.to_string();
                    entry.source_content = source_content.to_string();
                    CacheChange::Partial {
                        item_id: item_id.to_string(),
                        score: entry.score,
                    }
                }
                None => {
                    let Some(score) = partial_score else {
                        return false;
                    };
                    entries.insert(
                        item_id.to_string(),
                        CacheEntry {
                            source_content: source_content.to_string(),
                            score,
                            description: partial_text.to_string(),
                            streaming: true,
                            timestamp: None,
                        },
                    );
                    CacheChange::Partial {
                        item_id: item_id.to_string(),
                        score,
                    }
                }
            }
        };
        self.notify(&change);
        true
    }

    /// Writes the final entry for `item_id`, replacing any partial one, and
    /// persists immediately.
    pub async fn finalize(
        &self,
        item_id: &str,
        source_content: &str,
        score: u32,
        text: &str,
    ) -> CacheEntry {
        let entry = CacheEntry {
            source_content: source_content.to_string(),
            score,
            description: text.to_string(),
            streaming: false,
            timestamp: Some(chrono::Utc::now().timestamp_millis()),
        };
        self.entries
            .write()
            .insert(item_id.to_string(), entry.clone());
        self.notify(&CacheChange::Final {
            item_id: item_id.to_string(),
            score,
        });

        if let Err(e) = self.persist().await {
            warn!(item_id, error = %e, "failed to persist finalized rating");
        }
        entry
    }

    /// Removes the streaming entry of `item_id` left by an abandoned attempt.
    /// Final entries are kept.
    pub fn discard_partial(&self, item_id: &str) -> bool {
        let mut entries = self.entries.write();
        if entries.get(item_id).is_some_and(|e| !e.is_final()) {
            entries.remove(item_id);
            return true;
        }
        false
    }

    /// Writes the whole cache to the store.
    pub async fn persist(&self) -> StorageResult<()> {
        *self.last_persist.lock() = Some(Instant::now());
        self.write_snapshot().await
    }

    /// Persists unless a write happened within `persist_interval`.
    ///
    /// Returns `true` when a write was attempted. The slot is claimed before
    /// the write starts, so concurrent callers in the same window skip.
    pub async fn persist_debounced(&self) -> bool {
        {
            let mut last = self.last_persist.lock();
            let now = Instant::now();
            if let Some(at) = *last
                && now.duration_since(at) < self.persist_interval
            {
                return false;
            }
            *last = Some(now);
        }

        if let Err(e) = self.write_snapshot().await {
            warn!(error = %e, "debounced cache persist failed");
        }
        true
    }

    async fn write_snapshot(&self) -> StorageResult<()> {
        let _order = self.write_order.lock().await;
        let value = serde_json::to_value(self.snapshot())?;
        self.store.set(RATING_CACHE_KEY, value).await
    }

    /// Sorted copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<ItemId, CacheEntry> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Hydrates from the store, replacing memory. Stale streaming entries are
    /// dropped. Returns the number of entries loaded.
    pub async fn load(&self) -> StorageResult<usize> {
        let stored = self
            .store
            .get_or(RATING_CACHE_KEY, Value::Object(Default::default()))
            .await?;
        let parsed: HashMap<ItemId, CacheEntry> = serde_json::from_value(stored)?;
        let total = parsed.len();

        let finalized: HashMap<ItemId, CacheEntry> =
            parsed.into_iter().filter(|(_, e)| e.is_final()).collect();
        let loaded = finalized.len();
        if loaded < total {
            debug!(dropped = total - loaded, "discarded stale streaming entries");
        }

        *self.entries.write() = finalized;
        info!(entries = loaded, "rating cache loaded");
        Ok(loaded)
    }

    /// Removes every entry and persists the empty cache.
    pub async fn clear(&self) -> StorageResult<()> {
        self.entries.write().clear();
        self.notify(&CacheChange::Cleared);
        self.persist().await
    }

    pub fn subscribe(&self, observer: CacheObserver) {
        self.observers.write().push(observer);
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let mut stats = CacheStats::default();
        let mut total: u64 = 0;
        for entry in entries.values() {
            if entry.is_final() {
                stats.finalized += 1;
                total += u64::from(entry.score);
            } else {
                stats.streaming += 1;
            }
        }
        if stats.finalized > 0 {
            stats.mean_score = Some(total as f64 / stats.finalized as f64);
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn notify(&self, change: &CacheChange) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer(change);
        }
    }
}
