use std::time::Duration;
use thiserror::Error;

/// Longest response body excerpt carried inside an error.
const MAX_BODY_EXCERPT: usize = 512;

/// Failures surfaced by a [`CompletionTransport`](super::CompletionTransport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// DNS, connect, TLS, or abort before a status line arrived.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Endpoint answered with a non-2xx status.
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The connection broke while reading the body.
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl TransportError {
    pub(crate) fn status(status: u16, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_BODY_EXCERPT) {
            Some((idx, _)) => format!("{}...", &body[..idx]),
            None => body.to_string(),
        };
        Self::Status { status, body }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}
