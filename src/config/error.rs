//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A floating point variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidFloat {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    /// A value parsed but falls outside its allowed range.
    #[error("invalid {name}='{value}': must be {expected}")]
    OutOfRange {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A required setting is blank.
    #[error("{name} must not be empty")]
    Empty { name: &'static str },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },
}
