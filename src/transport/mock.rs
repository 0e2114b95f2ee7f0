//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;

use super::client::{ByteStream, CompletionTransport};
use super::error::TransportError;
use super::request::RatingRequest;
use super::response::RawResponse;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with this body (non-streaming requests).
    Body(String),
    /// Non-2xx status with this body.
    Status(u16, String),
    /// Transport failure before any response.
    Error(TransportError),
    /// Streaming body made of these chunks. With `hang`, the stream stays open
    /// and silent after the last chunk instead of closing.
    Stream { chunks: Vec<String>, hang: bool },
}

enum Scripted {
    Reply(MockReply),
    Channel(mpsc::Receiver<Result<Vec<u8>, TransportError>>),
}

/// A recorded dispatch.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub at: Instant,
    pub streaming: bool,
    pub request: RatingRequest,
}

/// Transport that replays queued replies in order, then `fallback` forever.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Option<MockReply>>,
    dispatches: Mutex<Vec<Dispatch>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that answers every request with `reply`.
    pub fn always(reply: MockReply) -> Self {
        let transport = Self::new();
        *transport.fallback.lock() = Some(reply);
        transport
    }

    pub fn push(&self, reply: MockReply) -> &Self {
        self.script.lock().push_back(Scripted::Reply(reply));
        self
    }

    /// Queues a stream fed by the returned sender. Dropping the sender closes it.
    pub fn push_channel(&self) -> mpsc::Sender<Result<Vec<u8>, TransportError>> {
        let (tx, rx) = mpsc::channel(64);
        self.script.lock().push_back(Scripted::Channel(rx));
        tx
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatches.lock().len()
    }

    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.dispatches.lock().clone()
    }

    fn next(&self, request: &RatingRequest, streaming: bool) -> Option<Scripted> {
        self.dispatches.lock().push(Dispatch {
            at: Instant::now(),
            streaming,
            request: request.clone(),
        });
        self.script
            .lock()
            .pop_front()
            .or_else(|| self.fallback.lock().clone().map(Scripted::Reply))
    }
}

fn unscripted() -> TransportError {
    TransportError::Connection("mock transport has no scripted reply".to_string())
}

#[async_trait]
impl CompletionTransport for MockTransport {
    async fn complete(
        &self,
        request: &RatingRequest,
        _api_key: &str,
        _timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        match self.next(request, false) {
            Some(Scripted::Reply(MockReply::Body(body))) => Ok(RawResponse { status: 200, body }),
            Some(Scripted::Reply(MockReply::Status(status, body))) => {
                Err(TransportError::status(status, &body))
            }
            Some(Scripted::Reply(MockReply::Error(err))) => Err(err),
            Some(Scripted::Reply(MockReply::Stream { .. })) | Some(Scripted::Channel(_)) => Err(
                TransportError::Connection("stream scripted for a non-streaming request".to_string()),
            ),
            None => Err(unscripted()),
        }
    }

    async fn open_stream(
        &self,
        request: &RatingRequest,
        _api_key: &str,
        _timeout: Duration,
    ) -> Result<ByteStream, TransportError> {
        match self.next(request, true) {
            Some(Scripted::Reply(MockReply::Stream { chunks, hang })) => {
                let body = stream::iter(chunks.into_iter().map(|c| Ok(c.into_bytes())));
                if hang {
                    Ok(body.chain(stream::pending()).boxed())
                } else {
                    Ok(body.boxed())
                }
            }
            Some(Scripted::Channel(rx)) => Ok(ReceiverStream::new(rx).boxed()),
            Some(Scripted::Reply(MockReply::Body(body))) => {
                Ok(stream::iter([Ok(body.into_bytes())]).boxed())
            }
            Some(Scripted::Reply(MockReply::Status(status, body))) => {
                Err(TransportError::status(status, &body))
            }
            Some(Scripted::Reply(MockReply::Error(err))) => Err(err),
            None => Err(unscripted()),
        }
    }
}

/// One server-sent event frame carrying a content delta.
pub fn sse_frame(content: &str) -> String {
    let payload = serde_json::json!({
        "id": "gen-mock",
        "choices": [{ "index": 0, "delta": { "role": "assistant", "content": content } }],
    });
    format!("data: {payload}\n\n")
}

/// The end-of-stream sentinel frame.
pub fn sse_done() -> String {
    "data: [DONE]\n\n".to_string()
}

/// A full non-streaming completion body with `content` as the first choice.
pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "gen-mock",
        "model": "mock/model",
        "choices": [{
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop",
            "index": 0
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20 }
    })
    .to_string()
}
