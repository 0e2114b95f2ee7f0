use serde::Serialize;
use serde_json::Value;

use crate::constants::FALLBACK_SCORE;

/// Outcome of the retry loop for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingResult {
    /// Extracted score, or [`FALLBACK_SCORE`] when `error` is set.
    pub score: Option<u32>,
    /// Rationale text (or the failure description).
    pub content: String,
    pub error: bool,
    /// Provider payload of the successful attempt: the response body, or the
    /// last event of a stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    /// Dispatches made, successful one included.
    pub attempts: u32,
}

impl RatingResult {
    pub fn success(score: u32, content: String, raw: Option<Value>, attempts: u32) -> Self {
        Self {
            score: Some(score),
            content,
            error: false,
            raw,
            attempts,
        }
    }

    pub fn failure(content: impl Into<String>, attempts: u32) -> Self {
        Self {
            score: Some(FALLBACK_SCORE),
            content: content.into(),
            error: true,
            raw: None,
            attempts,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        !self.error
    }
}
