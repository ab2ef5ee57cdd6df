//! Connection → username table

use dashmap::DashMap;
use std::fmt;
use uuid::Uuid;

/// Identifier of one open socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of the capability check at the top of an identity-requiring handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Authenticated(String),
    Unauthenticated,
}

/// Process-wide session table. Created at startup, entries removed on
/// disconnect, nothing persisted.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<ConnectionId, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `username` with the connection, replacing any previous entry
    pub fn bind(&self, connection_id: ConnectionId, username: impl Into<String>) {
        self.sessions.insert(connection_id, username.into());
    }

    pub fn resolve(&self, connection_id: ConnectionId) -> Option<String> {
        self.sessions
            .get(&connection_id)
            .map(|entry| entry.value().clone())
    }

    /// Remove the entry, returning who it belonged to
    pub fn unbind(&self, connection_id: ConnectionId) -> Option<String> {
        self.sessions
            .remove(&connection_id)
            .map(|(_, username)| username)
    }

    pub fn guard(&self, connection_id: ConnectionId) -> AuthState {
        match self.resolve(connection_id) {
            Some(username) => AuthState::Authenticated(username),
            None => AuthState::Unauthenticated,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
