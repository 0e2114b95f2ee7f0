use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Errors returned while fetching the model list.
pub enum ModelsError {
    /// The request did not complete.
    #[error("model list request failed: {0}")]
    Request(String),

    /// Endpoint answered with a non-2xx status.
    #[error("model list endpoint returned HTTP {0}")]
    Status(u16),

    /// Body was not a recognised model list.
    #[error("malformed model list: {0}")]
    Malformed(String),
}
