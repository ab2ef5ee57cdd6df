//! Storage seams for credentials and chat history
//!
//! The relay only ever appends and reads. Two backends implement the traits:
//! an in-memory store for development and tests, and a Message DB backed
//! store for persistent deployments.

pub mod event_store;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use event_store::MessageDbStore;
pub use memory::InMemoryStore;

/// Who authored a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }
}

/// A persisted chat turn. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub username: String,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(username: impl Into<String>, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            sender,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Override the creation time (builder pattern)
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A registered user with an Argon2 password hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

/// Errors surfaced by storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// Registration for a username that is already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Stored data could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Backend failure (connection, SQL, pool)
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<crate::message_db::Error> for StoreError {
    fn from(err: crate::message_db::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Lookup and registration of user credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Fails with `StoreError::UserExists` when the username is taken
    async fn create_user(&self, user: UserRecord) -> Result<(), StoreError>;
}

/// Append-only chat history
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, record: MessageRecord) -> Result<(), StoreError>;

    /// Most recent `limit` records for `username`, newest first
    async fn recent_for(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError>;
}
