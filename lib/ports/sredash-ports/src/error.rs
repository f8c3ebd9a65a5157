use thiserror::Error;

use crate::http::HttpMethod;

/// Failure of a single backend call.
///
/// `Transport` means no response was received at all; `Status` carries the
/// code of a response the caller did not accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("{method} {path}: {message}")]
    Transport {
        method: HttpMethod,
        path: String,
        message: String,
    },
    #[error("Request failed with status code {status}")]
    Status {
        method: HttpMethod,
        path: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode {path} response: {message}")]
    Decode { path: String, message: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProbeError {
    pub fn transport(method: HttpMethod, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            method,
            path: path.into(),
            message: message.into(),
        }
    }

    /// HTTP status of the failed call, if a response arrived.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
