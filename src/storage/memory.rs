//! In-memory store for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::KeyValueStore;
use super::error::{StorageError, StorageResult};

/// Map-backed store that counts writes and can be told to fail them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `key = value`.
    pub fn with_value(key: &str, value: Value) -> Self {
        let store = Self::new();
        store.values.write().insert(key.to_string(), value);
        store
    }

    /// Successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current value without going through the async trait.
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed("writes disabled".to_string()));
        }
        self.values.write().insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
