use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::RatingError;
use super::result::RatingResult;
use crate::config::Config;
use crate::constants::BACKOFF_UNIT;
use crate::ratelimit::RateLimiter;
use crate::scoring::extract_score;
use crate::streaming::{StreamDecoder, StreamEvent};
use crate::transport::{CompletionResponse, CompletionTransport, RatingRequest};

/// Snapshot of a streaming attempt after one delta.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamProgress {
    pub attempt: u32,
    pub delta: String,
    pub accumulated: String,
    /// Score found in `accumulated`, re-extracted on every delta.
    pub score: Option<u32>,
}

/// Receives live progress from streaming attempts.
#[async_trait]
pub trait AttemptObserver: Send + Sync {
    /// Called before attempt `attempt` dispatches. Progress reported earlier
    /// belongs to a previous attempt.
    async fn on_attempt_start(&self, _attempt: u32) {}

    async fn on_progress(&self, progress: &StreamProgress);
}

/// Observer that ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl AttemptObserver for NoopObserver {
    async fn on_progress(&self, _progress: &StreamProgress) {}
}

struct AttemptSuccess {
    score: u32,
    content: String,
    raw: Option<Value>,
}

struct AttemptFailure {
    error: RatingError,
    content: String,
}

impl From<RatingError> for AttemptFailure {
    fn from(error: RatingError) -> Self {
        Self {
            error,
            content: String::new(),
        }
    }
}

/// Bounded retry loop around single rating attempts.
///
/// Every attempt waits on the shared [`RateLimiter`], dispatches, decodes, and
/// runs the score extractor on the final text. Transport failures and
/// score-less responses both consume an attempt; attempt `n` is followed by a
/// sleep of `n² × backoff_unit`. Only terminal [`RatingError`]s or exhaustion
/// end the loop early.
pub struct RetryController {
    transport: Arc<dyn CompletionTransport>,
    limiter: Arc<RateLimiter>,
    max_retries: u32,
    request_timeout: Duration,
    stream_idle_timeout: Duration,
    backoff_unit: Duration,
}

impl std::fmt::Debug for RetryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryController")
            .field("max_retries", &self.max_retries)
            .field("request_timeout", &self.request_timeout)
            .field("stream_idle_timeout", &self.stream_idle_timeout)
            .field("backoff_unit", &self.backoff_unit)
            .finish()
    }
}

impl RetryController {
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        limiter: Arc<RateLimiter>,
        config: &Config,
    ) -> Self {
        Self {
            transport,
            limiter,
            max_retries: config.max_retries.max(1),
            request_timeout: config.request_timeout,
            stream_idle_timeout: config.stream_idle_timeout,
            backoff_unit: BACKOFF_UNIT,
        }
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Sleep after failed attempt `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt.saturating_mul(attempt)
    }

    /// Runs up to `max_retries` attempts of `request`.
    ///
    /// Always returns a result: on exhaustion it carries the fallback score
    /// with `error` set.
    pub async fn run(
        &self,
        request: &RatingRequest,
        api_key: &str,
        observer: &dyn AttemptObserver,
    ) -> RatingResult {
        let mut last_error: Option<RatingError> = None;
        let mut attempts = 0;

        for attempt in 1..=self.max_retries {
            attempts = attempt;
            observer.on_attempt_start(attempt).await;
            let outcome = if request.streaming {
                self.attempt_streaming(request, api_key, attempt, observer)
                    .await
            } else {
                self.attempt_blocking(request, api_key).await
            };

            match outcome {
                Ok(success) => {
                    info!(attempt, score = success.score, "rating succeeded");
                    return RatingResult::success(
                        success.score,
                        success.content,
                        success.raw,
                        attempt,
                    );
                }
                Err(failure) => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %failure.error,
                        content_len = failure.content.len(),
                        "rating attempt failed"
                    );
                    if failure.error.is_terminal() {
                        return RatingResult::failure(failure.error.to_string(), attempt);
                    }
                    last_error = Some(failure.error);
                }
            }

            if attempt < self.max_retries {
                let backoff = self.backoff_for(attempt);
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, "backing off");
                tokio::time::sleep(backoff).await;
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts were made".to_string());
        RatingResult::failure(
            format!("failed to get a valid rating after {attempts} attempts: {reason}"),
            attempts,
        )
    }

    async fn attempt_blocking(
        &self,
        request: &RatingRequest,
        api_key: &str,
    ) -> Result<AttemptSuccess, AttemptFailure> {
        self.limiter.acquire().await;
        let response = self
            .transport
            .complete(request, api_key, self.request_timeout)
            .await
            .map_err(RatingError::from)?;

        let (content, raw) = parse_completion(&response.body)?;
        match extract_score(&content) {
            Some(score) => Ok(AttemptSuccess {
                score,
                content,
                raw: Some(raw),
            }),
            None => Err(AttemptFailure {
                error: RatingError::NoScoreFound,
                content,
            }),
        }
    }

    async fn attempt_streaming(
        &self,
        request: &RatingRequest,
        api_key: &str,
        attempt: u32,
        observer: &dyn AttemptObserver,
    ) -> Result<AttemptSuccess, AttemptFailure> {
        self.limiter.acquire().await;
        let stream = self
            .transport
            .open_stream(request, api_key, self.request_timeout)
            .await
            .map_err(RatingError::from)?;

        let mut decoder = StreamDecoder::new(stream, self.stream_idle_timeout);
        let mut last_raw = None;
        let mut content = String::new();

        while let Some(event) = decoder.next_event().await {
            match event {
                StreamEvent::Delta {
                    delta,
                    accumulated,
                    raw,
                } => {
                    let progress = StreamProgress {
                        attempt,
                        score: extract_score(&accumulated),
                        delta,
                        accumulated,
                    };
                    observer.on_progress(&progress).await;
                    last_raw = Some(raw);
                }
                StreamEvent::Complete {
                    content: aggregate,
                    reason,
                } => {
                    debug!(?reason, content_len = aggregate.len(), "stream complete");
                    content = aggregate;
                    break;
                }
                StreamEvent::Failed { error, partial } => {
                    return Err(AttemptFailure {
                        error,
                        content: partial,
                    });
                }
            }
        }

        if content.trim().is_empty() {
            return Err(RatingError::SafetyFiltered.into());
        }
        match extract_score(&content) {
            Some(score) => Ok(AttemptSuccess {
                score,
                content,
                raw: last_raw,
            }),
            None => Err(AttemptFailure {
                error: RatingError::NoScoreFound,
                content,
            }),
        }
    }
}

/// Pulls the first choice's content out of a non-streaming body.
///
/// A body without choices and a choice with blank content are distinct
/// failures: [`RatingError::MissingChoices`] and [`RatingError::SafetyFiltered`].
pub fn parse_completion(body: &str) -> Result<(String, Value), RatingError> {
    let raw: Value = serde_json::from_str(body)?;
    let response: CompletionResponse = serde_json::from_value(raw.clone())?;

    if let Some(error) = response.error {
        return Err(RatingError::Provider {
            message: error.message,
        });
    }
    if response.choices.is_empty() {
        return Err(RatingError::MissingChoices);
    }

    let content = response.first_content().unwrap_or_default();
    if content.trim().is_empty() {
        return Err(RatingError::SafetyFiltered);
    }
    Ok((content.to_string(), raw))
}
