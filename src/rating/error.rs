use std::time::Duration;
use thiserror::Error;

use crate::transport::TransportError;

/// Why a rating attempt (or the whole pipeline) failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    #[error(transparent)]
    Transport(TransportError),

    /// The request itself timed out.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("response did not contain a SCORE_ token")]
    NoScoreFound,

    #[error("provider returned empty content, likely blocked by its content-safety policy")]
    SafetyFiltered,

    #[error("response contained no choices")]
    MissingChoices,

    /// An error object returned inside a 2xx body or a stream frame.
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("no API key configured")]
    MissingCredential,

    #[error("content unavailable: {reason}")]
    ContextUnavailable { reason: String },
}

impl RatingError {
    /// Terminal errors end the pipeline without consuming retries.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RatingError::MissingCredential | RatingError::ContextUnavailable { .. }
        )
    }

    pub fn context_unavailable(reason: impl Into<String>) -> Self {
        RatingError::ContextUnavailable {
            reason: reason.into(),
        }
    }
}

impl From<TransportError> for RatingError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(after) => RatingError::Timeout(after),
            other => RatingError::Transport(other),
        }
    }
}

impl From<serde_json::Error> for RatingError {
    fn from(err: serde_json::Error) -> Self {
        RatingError::Parse(err.to_string())
    }
}
