//! Post rater library crate (used by the `rater` binary and integration tests).
//!
//! # Public API Surface
//!
//! The pipeline, leaves first:
//!
//! - [`CompletionTransport`], [`HttpTransport`] - one request to the completions endpoint
//! - [`StreamDecoder`] - server-sent events to content deltas
//! - [`extract_score`] - the `SCORE_<digits>` rating token
//! - [`RateLimiter`] - process-wide request spacing
//! - [`RetryController`] - bounded retries with quadratic backoff
//! - [`ResultCache`] - partial and final ratings, persisted through a [`KeyValueStore`]
//! - [`ThreadContextAssembler`] - ancestor context for replies
//! - [`PipelineService`] - per-item scheduling, de-duplication and state
//!
//! ## Collaborators
//! - [`ContentExtractor`], [`FeedExtractor`] - where items come from
//! - [`IndicatorSink`] - where rating updates go
//! - [`ModelCatalog`] - which models accept images
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod extractor;
pub mod item;
pub mod models;
pub mod presentation;
pub mod ratelimit;
pub mod rating;
pub mod scoring;
pub mod storage;
pub mod streaming;
pub mod thread;
pub mod transport;

pub use cache::{CacheChange, CacheEntry, CacheObserver, CacheStats, ResultCache};
pub use config::{Config, ConfigError};
pub use constants::{FALLBACK_SCORE, MAX_SCORE, RATING_CACHE_KEY, REPLY_SEPARATOR};
pub use coordinator::{PipelineService, ProcessingState, ScheduleOutcome};
pub use extractor::{ContentExtractor, FeedExtractor};
pub use item::{Item, ItemId, format_context, with_ancestors};
pub use models::{ModelCatalog, ModelInfo, ModelPricing, ModelsError};
#[cfg(any(test, feature = "mock"))]
pub use presentation::RecordingSink;
pub use presentation::{IndicatorSink, IndicatorUpdate, JsonLinesSink, TracingSink};
pub use ratelimit::RateLimiter;
pub use rating::{
    AttemptObserver, NoopObserver, RatingError, RatingResult, RetryController, StreamProgress,
};
pub use scoring::{contains_score, extract_score};
#[cfg(any(test, feature = "mock"))]
pub use storage::MemoryStore;
pub use storage::{FileStore, KeyValueStore, StorageError};
pub use streaming::{CompletionReason, StreamDecoder, StreamEvent};
pub use thread::{ExtendOutcome, ThreadContextAssembler, ThreadMarker};
#[cfg(any(test, feature = "mock"))]
pub use transport::{MockReply, MockTransport, completion_body, sse_done, sse_frame};
pub use transport::{
    ByteStream, CompletionTransport, HttpTransport, RatingRequest, TransportError,
};
