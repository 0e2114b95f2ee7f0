use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
/// Errors returned by a [`KeyValueStore`](super::KeyValueStore).
pub enum StorageError {
    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes or a value could not be (de)serialised.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing file exists but does not hold a JSON object.
    #[error("store file is not a JSON object: {path}")]
    NotAnObject {
        /// File path.
        path: PathBuf,
    },

    /// A write was rejected.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Convenience result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;
