//! Cross-cutting, shared constants.
//!
//! Timing defaults live here so config, tests, and the pipeline agree on them.
//! Anything an operator may want to tune is also exposed through [`crate::Config`].

use std::time::Duration;

/// Score assigned when every attempt failed to produce a rating token.
pub const FALLBACK_SCORE: u32 = 5;

/// Score assigned to allow-listed authors.
pub const MAX_SCORE: u32 = 10;

/// Prefix of the rating token the model is instructed to emit (`SCORE_<digits>`).
pub const SCORE_TOKEN_PREFIX: &str = "SCORE_";

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base unit of the retry backoff; attempt `n` sleeps `n² × BACKOFF_UNIT`.
pub const BACKOFF_UNIT: Duration = Duration::from_millis(1000);

pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SCHEDULE_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_PERSIST_INTERVAL: Duration = Duration::from_millis(1000);

/// Consecutive empty chunks treated as an implicit end of stream.
pub const MAX_CONSECUTIVE_EMPTY_CHUNKS: usize = 3;

/// Data-line prefix of the server-sent event framing.
pub const SSE_DATA_PREFIX: &str = "data:";
/// Sentinel payload closing a completion stream.
pub const SSE_DONE_SENTINEL: &str = "[DONE]";

/// Separator placed between ancestor context and a reply's own content.
pub const REPLY_SEPARATOR: &str = "\n[REPLY]\n";

/// Key under which the result cache is persisted in the key-value store.
pub const RATING_CACHE_KEY: &str = "rating_cache";

pub const DEFAULT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODELS_URL: &str = "https://openrouter.ai/api/frontend/models";
pub const DEFAULT_MODEL_ID: &str = "google/gemini-2.5-flash-lite-preview-06-17";
pub const DEFAULT_PROVIDER_SORT: &str = "throughput";

/// How long a fetched model list stays fresh.
pub const MODEL_CATALOG_TTL: Duration = Duration::from_secs(60 * 60);

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a strict curator of short social media posts. \
Judge the post below for insight, originality, and usefulness to a thoughtful reader. \
Any text after [REPLY] is a reply; earlier blocks are the thread it responds to and are context only. \
Explain your reasoning in a few sentences, then finish with a single rating token of the form \
SCORE_X where X is an integer from 0 (worthless) to 10 (exceptional).";
