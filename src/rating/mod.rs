//! Bounded retry of rating attempts.
//!
//! [`RetryController::run`] drives up to `max_retries` attempts through the
//! rate limiter, transport, stream decoder and score extractor, and always
//! returns a [`RatingResult`]: a scored success, or the fallback score with
//! `error` set.

pub mod error;
pub mod result;
pub mod retry;


pub use error::RatingError;
pub use result::RatingResult;
pub use retry::{AttemptObserver, NoopObserver, RetryController, StreamProgress, parse_completion};
