// The upload client only ever talks to the service through this trait. Auth,
// retries and the actual HTTP stack live behind it so the protocol logic can
// be exercised against a test double.
mod http;
mod retryable;

pub use http::{HttpTransport, HttpTransportArgs};
pub use retryable::RetrySettings;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Bytes(Bytes),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    /// Path relative to the API base, without a leading slash.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Replaces the content type implied by `body`.
    pub content_type: Option<String>,
}

impl TransportRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            content_type: None,
        }
    }

    pub fn with_json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn with_bytes(mut self, bytes: Bytes, content_type: impl Into<String>) -> Self {
        self.body = RequestBody::Bytes(bytes);
        self.content_type = Some(content_type.into());
        self
    }
}

/// Raw answer of the service. The body is fully read, so nothing stays open
/// once the exchange returns.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("unexpected transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() || err.is_request() {
            TransportError::Request(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// One request/response exchange with the remote API.
///
/// Dropping the returned future cancels the exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
