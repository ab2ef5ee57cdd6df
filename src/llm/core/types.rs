//! Provider-neutral conversation types

use serde::{Deserialize, Serialize};

use super::config::GenerationConfig;
use crate::store::{MessageRecord, Sender};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instruction frame, never persisted
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl From<Sender> for ChatRole {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::Ai => ChatRole::Assistant,
            Sender::User => ChatRole::User,
        }
    }
}

/// A single turn in the conversation sent to a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&MessageRecord> for ChatTurn {
    fn from(record: &MessageRecord) -> Self {
        Self {
            role: record.sender.into(),
            content: record.content.clone(),
        }
    }
}

/// Request to generate one reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// System frame first, then the conversation window oldest to newest
    pub turns: Vec<ChatTurn>,
    pub config: GenerationConfig,
}

impl ChatRequest {
    pub fn new(turns: Vec<ChatTurn>, config: GenerationConfig) -> Self {
        Self { turns, config }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_to_role() {
        assert_eq!(ChatRole::from(Sender::Ai), ChatRole::Assistant);
        assert_eq!(ChatRole::from(Sender::User), ChatRole::User);
    }

    #[test]
    fn test_turn_from_record() {
        let record = MessageRecord::new("alice", Sender::Ai, "Hi!");
        let turn = ChatTurn::from(&record);
        assert_eq!(turn, ChatTurn::assistant("Hi!"));
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&ChatRole::System).unwrap(), r#""system""#);
        assert_eq!(ChatRole::Assistant.as_str(), "assistant");
    }
}
