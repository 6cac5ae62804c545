use std::pin::Pin;

use bytes::Bytes;
use futures::StreamExt as _;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::errors::TaskError;

/// Raw chunk stream of one task response body.
pub type ByteStream = Pin<Box<dyn futures::Stream<Item = Result<Bytes, TaskError>> + Send + 'static>>;

/// Transport seam between the session pump and the network.
///
/// The production implementation is `HttpTransport`; tests substitute fakes
/// built from in-memory streams.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    /// Issues the task-start request and returns the response body stream.
    ///
    /// Must fail with `TaskError::Status` on a non-success response; in that
    /// case no bytes are ever surfaced to the caller.
    async fn open(&self, endpoint: &str, body: &Value) -> Result<ByteStream, TaskError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TaskError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TaskError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl StreamTransport for HttpTransport {
    async fn open(&self, endpoint: &str, body: &Value) -> Result<ByteStream, TaskError> {
        let response = self
            .http
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| TaskError::transport(format!("task request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TaskError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Box::pin(response.bytes_stream().map(|item| {
            item.map_err(|e| TaskError::transport(format!("stream read failed: {e}")))
        })))
    }
}
