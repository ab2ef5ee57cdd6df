// Wire types for the socket protocol and the HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::store::{MessageRecord, Sender};

/// Envelope of every inbound socket frame. `data` may be absent or null.
#[derive(Debug, Deserialize)]
struct ClientFrame {
    event: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

// Socket events sent by the client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Authenticate { token: Option<String> },
    /// A missing or non-string message arrives as an empty string
    SendMessage { message: String },
}

impl ClientEvent {
    pub fn parse(frame: &str) -> Result<Self, FrameError> {
        let frame: ClientFrame = serde_json::from_str(frame)?;
        let field = |name: &str| {
            frame
                .data
                .as_ref()
                .and_then(|data| data.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        match frame.event.as_str() {
            "authenticate" => Ok(ClientEvent::Authenticate {
                token: field("token"),
            }),
            "send_message" => Ok(ClientEvent::SendMessage {
                message: field("message").unwrap_or_default(),
            }),
            _ => Err(FrameError::UnknownEvent(frame.event)),
        }
    }
}

// Socket events sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    System {
        message: String,
    },
    Message {
        sender: Sender,
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    pub fn system(message: impl Into<String>) -> Self {
        ServerEvent::System {
            message: message.into(),
        }
    }

    pub fn chat(record: &MessageRecord) -> Self {
        ServerEvent::Message {
            sender: record.sender,
            content: record.content.clone(),
            timestamp: record.created_at,
        }
    }
}

// HTTP request/response types

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsRequest {
    /// Trimmed username and raw password, or None if either is missing/blank
    pub fn parts(&self) -> Option<(String, &str)> {
        let username = self.username.as_deref()?.trim();
        let password = self.password.as_deref()?;
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some((username.to_string(), password))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
}
