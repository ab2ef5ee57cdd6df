//! Message DB backed store
//!
//! Each user owns two streams: `user-<username>` holds a single `Registered`
//! event and `chat-<username>` holds the conversation as `UserMessage` and
//! `AiMessage` events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{CredentialStore, MessageRecord, MessageStore, Sender, StoreError, UserRecord};
use crate::message_db::{self, MessageDbClient, StreamReadOptions, WriteMessage};

const USER_CATEGORY: &str = "user";
const CHAT_CATEGORY: &str = "chat";
const REGISTERED: &str = "Registered";
const USER_MESSAGE: &str = "UserMessage";
const AI_MESSAGE: &str = "AiMessage";

/// Payload of chat events
#[derive(Debug, Serialize, Deserialize)]
struct ChatEventData {
    content: String,
    created_at: DateTime<Utc>,
}

pub fn user_stream(username: &str) -> String {
    format!("{}-{}", USER_CATEGORY, username)
}

pub fn chat_stream(username: &str) -> String {
    format!("{}-{}", CHAT_CATEGORY, username)
}

fn event_type(sender: Sender) -> &'static str {
    match sender {
        Sender::User => USER_MESSAGE,
        Sender::Ai => AI_MESSAGE,
    }
}

fn sender_for(message_type: &str) -> Result<Sender, StoreError> {
    match message_type {
        USER_MESSAGE => Ok(Sender::User),
        AI_MESSAGE => Ok(Sender::Ai),
        other => Err(StoreError::Corrupt(format!(
            "unexpected event type in chat stream: {}",
            other
        ))),
    }
}

fn to_record(username: &str, msg: message_db::Message) -> Result<MessageRecord, StoreError> {
    let sender = sender_for(&msg.message_type)?;
    let data: ChatEventData = serde_json::from_value(msg.data)?;
    Ok(MessageRecord {
        username: username.to_string(),
        sender,
        content: data.content,
        created_at: data.created_at,
    })
}

/// Order by `created_at` descending, later stream position first on ties.
///
/// Overlapping sends from several devices can append a reply after a
/// newer one, so stream order alone is not time order.
fn newest_first(mut positioned: Vec<(i64, MessageRecord)>) -> Vec<MessageRecord> {
    positioned.sort_by(|(pa, a), (pb, b)| {
        b.created_at.cmp(&a.created_at).then_with(|| pb.cmp(pa))
    });
    positioned.into_iter().map(|(_, record)| record).collect()
}

/// Credentials and history persisted in Message DB streams
#[derive(Clone)]
pub struct MessageDbStore {
    client: MessageDbClient,
}

impl MessageDbStore {
    pub fn new(client: MessageDbClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialStore for MessageDbStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let options = StreamReadOptions::new(user_stream(username)).with_batch_size(1);
        let events = self.client.get_stream_messages(options).await?;

        match events.into_iter().find(|e| e.message_type == REGISTERED) {
            Some(event) => Ok(Some(serde_json::from_value(event.data)?)),
            None => Ok(None),
        }
    }

    async fn create_user(&self, user: UserRecord) -> Result<(), StoreError> {
        let msg = WriteMessage::new(user_stream(&user.username), REGISTERED)
            .with_data(serde_json::to_value(&user)?)
            .with_expected_version(-1);

        match self.client.write_message(msg).await {
            Ok(_) => Ok(()),
            Err(message_db::Error::ConcurrencyError { .. }) => {
                Err(StoreError::UserExists(user.username))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MessageStore for MessageDbStore {
    async fn append(&self, record: MessageRecord) -> Result<(), StoreError> {
        let msg = WriteMessage::new(chat_stream(&record.username), event_type(record.sender))
            .with_data(json!({
                "content": record.content,
                "created_at": record.created_at,
            }));

        let position = self.client.write_message(msg).await?;
        debug!(username = %record.username, position, "chat event appended");
        Ok(())
    }

    async fn recent_for(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let stream = chat_stream(username);
        let Some(version) = self.client.stream_version(&stream).await? else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        let options = StreamReadOptions::tail(stream, version, limit as i64);
        let events = self.client.get_stream_messages(options).await?;

        let positioned = events
            .into_iter()
            .map(|event| {
                let position = event.position;
                to_record(username, event).map(|record| (position, record))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(newest_first(positioned))
    }
}
