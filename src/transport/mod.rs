//! Completion transport: one request to the remote completions endpoint,
//! collected whole or exposed as an incremental byte stream.
//!
//! Failures (connect, timeout, non-2xx) come back as [`TransportError`];
//! nothing here looks inside the payload.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod request;
pub mod response;


pub use client::{ByteStream, CompletionTransport, HttpTransport};
pub use error::TransportError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{Dispatch, MockReply, MockTransport, completion_body, sse_done, sse_frame};
pub use request::{CompletionBody, RatingRequest, UserContent};
pub use response::{CompletionResponse, RawResponse};
