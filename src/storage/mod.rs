//! Key-value persistence for settings and the rating cache.

/// Store error types.
pub mod error;
pub mod file;
#[cfg(any(test, feature = "mock"))]
pub mod memory;

#[cfg(test)]
mod tests;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
#[cfg(any(test, feature = "mock"))]
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
/// A flat map from string keys to JSON values.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value under `key`, if any.
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Replaces the value under `key`.
    async fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Returns the value under `key`, or `default` when absent.
    async fn get_or(&self, key: &str, default: Value) -> StorageResult<Value> {
        Ok(self.get(key).await?.unwrap_or(default))
    }
}
