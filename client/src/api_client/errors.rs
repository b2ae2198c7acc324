use std::{fmt::Display, path::PathBuf};

use file_upload_library::models::UploadId;
use reqwest::StatusCode;
use thiserror::Error;

use crate::transport::{TransportError, TransportResponse};

/// Which call failed, and for which upload when one was addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub id: Option<UploadId>,
}

impl Operation {
    pub(crate) fn new(name: &'static str) -> Self {
        Self { name, id: None }
    }

    pub(crate) fn for_upload(name: &'static str, id: &UploadId) -> Self {
        Self {
            name,
            id: Some(id.clone()),
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} (upload {})", self.name, id),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The service answered, but not in the way the protocol says it should.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("failed to decode response body: {source}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected object type {0:?}")]
    UnexpectedObject(String),
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("failed to read upload content: {0}")]
    ReadContent(#[source] std::io::Error),

    #[error("failed to serialize request body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build multipart form: {0}")]
    Form(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{operation}: invalid request: {reason}")]
    Validation { operation: Operation, reason: String },

    #[error("{operation}: transport failure: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    #[error("{operation}: {source}")]
    Protocol {
        operation: Operation,
        #[source]
        source: ProtocolError,
    },

    #[error("{operation}: {source}")]
    Encoding {
        operation: Operation,
        #[source]
        source: EncodingError,
    },

    #[error("{operation}: failed to access {}: {source}", .path.display())]
    Io {
        operation: Operation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    pub(crate) fn validation(operation: Operation, reason: impl Into<String>) -> Self {
        UploadError::Validation {
            operation,
            reason: reason.into(),
        }
    }

    pub(crate) fn protocol(operation: Operation, source: ProtocolError) -> Self {
        UploadError::Protocol { operation, source }
    }

    pub(crate) fn from_response(operation: Operation, resp: TransportResponse) -> Self {
        UploadError::protocol(
            operation,
            ProtocolError::UnexpectedStatus {
                status: resp.status,
                body: resp.body_text(),
            },
        )
    }

    pub fn operation(&self) -> &Operation {
        match self {
            UploadError::Validation { operation, .. }
            | UploadError::Transport { operation, .. }
            | UploadError::Protocol { operation, .. }
            | UploadError::Encoding { operation, .. }
            | UploadError::Io { operation, .. } => operation,
        }
    }

    /// Status reported by the service, when it answered with an unexpected one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UploadError::Protocol {
                source: ProtocolError::UnexpectedStatus { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }
}
