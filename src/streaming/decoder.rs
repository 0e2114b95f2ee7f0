use std::collections::VecDeque;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::constants::{MAX_CONSECUTIVE_EMPTY_CHUNKS, SSE_DATA_PREFIX, SSE_DONE_SENTINEL};
use crate::rating::RatingError;
use crate::transport::ByteStream;

/// Why a stream finished without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// `[DONE]` sentinel received.
    Done,
    /// Nothing arrived within the inactivity window.
    IdleTimeout,
    /// Too many consecutive empty chunks.
    EmptyChunks,
    /// Transport closed the body.
    EndOfBody,
}

/// One step of a decoded completion stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Delta {
        delta: String,
        accumulated: String,
        raw: Value,
    },
    Complete {
        content: String,
        reason: CompletionReason,
    },
    Failed {
        error: RatingError,
        partial: String,
    },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Delta { .. })
    }
}

/// Turns a raw server-sent-event byte stream into content deltas.
///
/// Yields any number of [`StreamEvent::Delta`] followed by exactly one terminal
/// event, then `None`. Dropping the decoder drops the transport stream.
pub struct StreamDecoder {
    stream: ByteStream,
    idle_timeout: Duration,
    deadline: Instant,
    line_buffer: Vec<u8>,
    accumulated: String,
    pending: VecDeque<StreamEvent>,
    empty_chunks: usize,
    finished: bool,
}

impl std::fmt::Debug for StreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecoder")
            .field("idle_timeout", &self.idle_timeout)
            .field("accumulated_len", &self.accumulated.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl StreamDecoder {
    pub fn new(stream: ByteStream, idle_timeout: Duration) -> Self {
        Self {
            stream,
            idle_timeout,
            deadline: Instant::now() + idle_timeout,
            line_buffer: Vec::new(),
            accumulated: String::new(),
            pending: VecDeque::new(),
            empty_chunks: 0,
            finished: false,
        }
    }

    /// Content accumulated so far.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }

            match timeout_at(self.deadline, self.stream.next()).await {
                Err(_) => {
                    debug!(
                        idle_secs = self.idle_timeout.as_secs_f32(),
                        accumulated_len = self.accumulated.len(),
                        "stream idle, completing with accumulated content"
                    );
                    self.complete(CompletionReason::IdleTimeout);
                }
                Ok(None) => {
                    if !self.line_buffer.is_empty() {
                        let rest = std::mem::take(&mut self.line_buffer);
                        self.process_line(&rest);
                    }
                    if !self.finished {
                        self.complete(CompletionReason::EndOfBody);
                    }
                }
                Ok(Some(Err(error))) => {
                    warn!(error = %error, "completion stream broke");
                    self.fail(error.into());
                }
                Ok(Some(Ok(chunk))) => self.ingest(&chunk),
            }
        }
    }

    /// Drains the stream into a list of events, terminal event last.
    pub async fn collect(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    fn ingest(&mut self, chunk: &[u8]) {
        // Blank chunks may still terminate a buffered line, but never reset the idle timer.
        if chunk.iter().all(u8::is_ascii_whitespace) {
            self.empty_chunks += 1;
        } else {
            self.empty_chunks = 0;
            self.deadline = Instant::now() + self.idle_timeout;
        }

        self.line_buffer.extend_from_slice(chunk);
        while let Some(pos) = self.line_buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.line_buffer.drain(..=pos).collect();
            self.process_line(&line);
            if self.finished {
                self.line_buffer.clear();
                return;
            }
        }

        if self.empty_chunks >= MAX_CONSECUTIVE_EMPTY_CHUNKS {
            debug!(
                count = self.empty_chunks,
                "consecutive empty chunks, treating as end of stream"
            );
            self.complete(CompletionReason::EmptyChunks);
        }
    }

    fn process_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        let Some(payload) = line.strip_prefix(SSE_DATA_PREFIX) else {
            return;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return;
        }
        if payload == SSE_DONE_SENTINEL {
            self.complete(CompletionReason::Done);
            return;
        }

        let raw: Value = match serde_json::from_str(payload) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, line_len = payload.len(), "skipping malformed stream event");
                return;
            }
        };

        if let Some(error) = raw.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            self.fail(RatingError::Provider { message });
            return;
        }

        let delta = raw
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.accumulated.push_str(&delta);
        self.pending.push_back(StreamEvent::Delta {
            delta,
            accumulated: self.accumulated.clone(),
            raw,
        });
    }

    fn complete(&mut self, reason: CompletionReason) {
        self.finished = true;
        self.pending.push_back(StreamEvent::Complete {
            content: self.accumulated.clone(),
            reason,
        });
    }

    fn fail(&mut self, error: RatingError) {
        self.finished = true;
        self.pending.push_back(StreamEvent::Failed {
            error,
            partial: self.accumulated.clone(),
        });
    }
}
