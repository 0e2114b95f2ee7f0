//! Single-file JSON store.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::KeyValueStore;
use super::error::{StorageError, StorageResult};

/// Keeps every key in one JSON object on disk.
///
/// The object is read once on first access and held in memory afterwards.
/// Every `set` rewrites the whole file through a temp file and a rename, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Mutex<Option<Map<String, Value>>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_object(path: PathBuf) -> StorageResult<Map<String, Value>> {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map),
            _ => Err(StorageError::NotAnObject { path }),
        }
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(path)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let mut state = self.state.lock().await;
        if state.is_none() {
            *state = Some(Self::read_object(self.path.clone()).await?);
        }
        Ok(state.as_ref().and_then(|map| map.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        let mut map = match state.take() {
            Some(map) => map,
            None => Self::read_object(self.path.clone()).await?,
        };
        map.insert(key.to_string(), value);

        let bytes = serde_json::to_vec(&map);
        // Keep the in-memory copy current even if the write below fails.
        *state = Some(map);
        let bytes = bytes?;

        let path = self.path.clone();
        let len = bytes.len();
        tokio::task::spawn_blocking(move || Self::write_atomic(&path, &bytes))
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))??;

        debug!(key, bytes = len, path = %self.path.display(), "store written");
        Ok(())
    }
}
