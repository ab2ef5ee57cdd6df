//! In-process store used when no database is configured

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CredentialStore, MessageRecord, MessageStore, StoreError, UserRecord};

/// Credentials and history held in memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
    /// Per-user history in insertion order
    messages: RwLock<HashMap<String, Vec<MessageRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full history for a user in insertion order
    pub async fn all_for(&self, username: &str) -> Vec<MessageRecord> {
        self.messages
            .read()
            .await
            .get(username)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove a user record, leaving history intact
    pub async fn remove_user(&self, username: &str) -> Option<UserRecord> {
        self.users.write().await.remove(username)
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn create_user(&self, user: UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(StoreError::UserExists(user.username));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn append(&self, record: MessageRecord) -> Result<(), StoreError> {
        self.messages
            .write()
            .await
            .entry(record.username.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn recent_for(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let messages = self.messages.read().await;
        let Some(history) = messages.get(username) else {
            return Ok(Vec::new());
        };

        // Stable sort keeps insertion order as the tie-break
        let mut ordered: Vec<(usize, &MessageRecord)> = history.iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| {
            b.created_at.cmp(&a.created_at).then_with(|| ib.cmp(ia))
        });

        Ok(ordered
            .into_iter()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }
}
