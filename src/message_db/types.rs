use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An event to append to a stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteMessage {
    pub id: Uuid,
    pub stream_name: String,
    /// Event type (e.g. "UserMessage", "Registered")
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Stream version the writer expects; -1 means the stream must not exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<i64>,
}

impl WriteMessage {
    /// Create an event with a fresh id and empty data
    pub fn new(stream_name: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream_name: stream_name.into(),
            message_type: message_type.into(),
            data: Value::Object(serde_json::Map::new()),
            metadata: None,
            expected_version: None,
        }
    }

    /// Set the data payload (builder pattern)
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Require the stream to be at `version` (builder pattern)
    pub fn with_expected_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// An event read back from a stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub stream_name: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub data: Value,
    pub metadata: Option<Value>,
    /// 0-based position within the stream
    pub position: i64,
    pub global_position: i64,
    pub time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_message_builder() {
        let msg = WriteMessage::new("user-alice", "Registered")
            .with_data(json!({ "username": "alice" }))
            .with_expected_version(-1);

        assert_eq!(msg.stream_name, "user-alice");
        assert_eq!(msg.message_type, "Registered");
        assert_eq!(msg.data["username"], "alice");
        assert_eq!(msg.expected_version, Some(-1));
        assert!(msg.metadata.is_none());
    }

    #[test]
    fn test_write_message_serializes_type_field() {
        let msg = WriteMessage::new("chat-alice", "UserMessage");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "UserMessage");
        assert!(value.get("expected_version").is_none());
    }
}
