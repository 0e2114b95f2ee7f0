use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::header::ACCEPT;
use tracing::debug;

use super::error::TransportError;
use super::request::RatingRequest;
use super::response::RawResponse;

/// Incremental response body, chunk by chunk, as received from the wire.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

#[async_trait]
/// Issues a single request to the completions endpoint. Never interprets the payload.
pub trait CompletionTransport: Send + Sync {
    /// Sends `request` and collects the whole 2xx body.
    async fn complete(
        &self,
        request: &RatingRequest,
        api_key: &str,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;

    /// Sends `request` and returns the body as it arrives. `timeout` bounds the
    /// wait for response headers only; stalls mid-body are the decoder's concern.
    async fn open_stream(
        &self,
        request: &RatingRequest,
        api_key: &str,
        timeout: Duration,
    ) -> Result<ByteStream, TransportError>;
}

/// `reqwest`-backed transport for an OpenAI-compatible completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Returns the configured endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn complete(
        &self,
        request: &RatingRequest,
        api_key: &str,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(&request.to_body())
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;

        if !status.is_success() {
            return Err(TransportError::status(status.as_u16(), &body));
        }

        debug!(status = status.as_u16(), bytes = body.len(), "completion received");
        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }

    async fn open_stream(
        &self,
        request: &RatingRequest,
        api_key: &str,
        timeout: Duration,
    ) -> Result<ByteStream, TransportError> {
        let send = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .header(ACCEPT, "text/event-stream")
            .json(&request.to_body())
            .send();

        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::status(status.as_u16(), &body));
        }

        debug!(status = status.as_u16(), "completion stream opened");
        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| TransportError::Body(e.to_string()))
            })
            .boxed())
    }
}
