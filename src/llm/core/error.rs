//! Error types for the provider layer

use thiserror::Error;

/// Errors that can occur when calling an AI provider
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider answered with a non-2xx status
    #[error("HTTP error (status {status}): {body}")]
    HttpError { status: u16, body: String },

    /// Request did not complete within the configured bound
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure before any status was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON encoding/decoding issues
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LlmError {
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return LlmError::Timeout;
        }
        if err.is_decode() {
            return LlmError::SerializationError(err.to_string());
        }
        match err.status() {
            Some(status) => LlmError::HttpError {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => LlmError::Transport(err.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for LlmError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        LlmError::Timeout
    }
}
