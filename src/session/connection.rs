//! Per-connection state machine
//!
//! Each socket gets a [`Connection`] (its id plus the outbound queue). The
//! shared [`ConnectionHandler`] drives it through connect, any number of
//! `authenticate`/`send_message` events, and disconnect. Every method
//! returns a [`Flow`] telling the socket loop whether to keep reading.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::auth::{verify_identity, AuthFailure, TokenCodec};
use crate::llm::Responder;
use crate::models::{ClientEvent, ServerEvent};
use crate::store::{CredentialStore, MessageRecord, MessageStore, Sender, StoreError};

use super::registry::{AuthState, ConnectionId, SessionRegistry};

pub const AUTH_REQUIRED: &str = "Authentication required";
pub const TOKEN_EXPIRED: &str = "Token expired";
pub const INVALID_TOKEN: &str = "Invalid token";
pub const CONNECTION_ERROR: &str = "Connection error";
pub const AUTHENTICATION_ERROR: &str = "Authentication error";
pub const NOT_AUTHENTICATED: &str = "Not authenticated";
pub const EMPTY_MESSAGE: &str = "Message cannot be empty";
pub const PROCESSING_ERROR: &str = "Error processing message";
pub const UNRECOGNIZED_EVENT: &str = "Unrecognized event";

/// What the socket loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Outbound channel closed")]
    ChannelClosed,
}

/// One live socket: its id and the queue drained by the writer task
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<ServerEvent>,
}

impl Connection {
    pub fn new(outbound: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id: ConnectionId::new(),
            outbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn emit(&self, event: ServerEvent) -> Result<(), HandlerError> {
        self.outbound
            .send(event)
            .map_err(|_| HandlerError::ChannelClosed)
    }

    /// Best-effort system notice; a closed queue only means the peer is gone
    fn notify(&self, message: &str) {
        if self.emit(ServerEvent::system(message)).is_err() {
            debug!(connection_id = %self.id, "dropping notice for closed connection");
        }
    }
}

/// Shared logic for every connection
#[derive(Clone)]
pub struct ConnectionHandler {
    sessions: Arc<SessionRegistry>,
    codec: TokenCodec,
    credentials: Arc<dyn CredentialStore>,
    messages: Arc<dyn MessageStore>,
    responder: Arc<Responder>,
}

impl ConnectionHandler {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        codec: TokenCodec,
        credentials: Arc<dyn CredentialStore>,
        messages: Arc<dyn MessageStore>,
        responder: Arc<Responder>,
    ) -> Self {
        Self {
            sessions,
            codec,
            credentials,
            messages,
            responder,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Handshake. Any failure ends the connection.
    pub async fn connect(&self, conn: &Connection, token: Option<&str>) -> Flow {
        match verify_identity(&self.codec, self.credentials.as_ref(), token).await {
            Ok(username) => {
                self.sessions.bind(conn.id(), username.clone());
                info!(connection_id = %conn.id(), username = %username, "client connected");
                conn.notify(&format!("Welcome, {}!", username));
                Flow::Continue
            }
            Err(failure) => {
                let notice = match &failure {
                    AuthFailure::Missing => AUTH_REQUIRED,
                    AuthFailure::Expired => TOKEN_EXPIRED,
                    AuthFailure::Invalid => INVALID_TOKEN,
                    AuthFailure::Store(e) => {
                        error!(connection_id = %conn.id(), error = %e, "credential lookup failed during connect");
                        CONNECTION_ERROR
                    }
                };
                info!(connection_id = %conn.id(), reason = notice, "rejecting connection");
                conn.notify(notice);
                Flow::Close
            }
        }
    }

    /// Parse one inbound text frame and dispatch it
    pub async fn handle_frame(&self, conn: &Connection, frame: &str) -> Flow {
        match ClientEvent::parse(frame) {
            Ok(ClientEvent::Authenticate { token }) => {
                self.authenticate(conn, token.as_deref()).await
            }
            Ok(ClientEvent::SendMessage { message }) => self.send_message(conn, &message).await,
            Err(e) => {
                debug!(connection_id = %conn.id(), error = %e, "unrecognized frame");
                conn.notify(UNRECOGNIZED_EVENT);
                Flow::Continue
            }
        }
    }

    /// Re-authentication. Never closes; a failure keeps any prior session.
    pub async fn authenticate(&self, conn: &Connection, token: Option<&str>) -> Flow {
        match verify_identity(&self.codec, self.credentials.as_ref(), token).await {
            Ok(username) => {
                self.sessions.bind(conn.id(), username.clone());
                info!(connection_id = %conn.id(), username = %username, "client authenticated");
                conn.notify(&format!("Authenticated as {}", username));
            }
            Err(failure) => {
                let notice = match &failure {
                    AuthFailure::Missing => AUTH_REQUIRED,
                    AuthFailure::Expired => TOKEN_EXPIRED,
                    AuthFailure::Invalid => INVALID_TOKEN,
                    AuthFailure::Store(e) => {
                        error!(connection_id = %conn.id(), error = %e, "credential lookup failed during authenticate");
                        AUTHENTICATION_ERROR
                    }
                };
                conn.notify(notice);
            }
        }
        Flow::Continue
    }

    pub async fn send_message(&self, conn: &Connection, text: &str) -> Flow {
        let username = match self.sessions.guard(conn.id()) {
            AuthState::Authenticated(username) => username,
            AuthState::Unauthenticated => {
                conn.notify(NOT_AUTHENTICATED);
                return Flow::Continue;
            }
        };

        let content = text.trim();
        if content.is_empty() {
            conn.notify(EMPTY_MESSAGE);
            return Flow::Continue;
        }

        if let Err(e) = self.relay(conn, &username, content).await {
            error!(connection_id = %conn.id(), username = %username, error = %e, "failed to process message");
            conn.notify(PROCESSING_ERROR);
        }
        Flow::Continue
    }

    /// Persist the user turn, ask the responder, persist and emit the reply
    async fn relay(
        &self,
        conn: &Connection,
        username: &str,
        content: &str,
    ) -> Result<(), HandlerError> {
        let user_record = MessageRecord::new(username, Sender::User, content);
        self.messages.append(user_record.clone()).await?;
        conn.emit(ServerEvent::chat(&user_record))?;

        let reply = self.responder.reply(username).await;

        // Clock may step backwards; the reply never predates the prompt
        let replied_at = Utc::now().max(user_record.created_at);
        let ai_record = MessageRecord::new(username, Sender::Ai, reply).with_created_at(replied_at);
        self.messages.append(ai_record.clone()).await?;
        conn.emit(ServerEvent::chat(&ai_record))?;

        Ok(())
    }

    pub fn disconnect(&self, conn: &Connection) {
        match self.sessions.unbind(conn.id()) {
            Some(username) => {
                info!(connection_id = %conn.id(), username = %username, "client disconnected")
            }
            None => warn!(connection_id = %conn.id(), "anonymous client disconnected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatProvider, ChatRequest, LlmError, ResponderConfig};
    use crate::store::{InMemoryStore, UserRecord};
    use async_trait::async_trait;
    use chrono::Duration;

    const SECRET: &str = "connection-test-secret-long-enough";

    struct EchoProvider;

    #[async_trait]
    impl ChatProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn generate(&self, request: &ChatRequest) -> Result<String, LlmError> {
            let last = request
                .turns
                .last()
                .map(|t| t.content.clone())
                .unwrap_or_default();
            Ok(format!("echo: {}", last))
        }
    }

    /// Store whose every call fails
    struct BrokenStore;

    #[async_trait]
    impl CredentialStore for BrokenStore {
        async fn find_by_username(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn create_user(&self, _: UserRecord) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl MessageStore for BrokenStore {
        async fn append(&self, _: MessageRecord) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn recent_for(&self, _: &str, _: usize) -> Result<Vec<MessageRecord>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
    }

    struct Fixture {
        handler: ConnectionHandler,
        store: Arc<InMemoryStore>,
        codec: TokenCodec,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        for name in ["alice", "bob"] {
            store
                .create_user(UserRecord::new(name, "hash"))
                .await
                .unwrap();
        }
        let codec = TokenCodec::new(SECRET, Duration::hours(1));
        let responder = Responder::new(store.clone(), ResponderConfig::default())
            .with_primary(Arc::new(EchoProvider));
        let handler = ConnectionHandler::new(
            Arc::new(SessionRegistry::new()),
            codec.clone(),
            store.clone(),
            store.clone(),
            Arc::new(responder),
        );
        Fixture {
            handler,
            store,
            codec,
        }
    }

    fn open() -> (Connection, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn system(message: &str) -> ServerEvent {
        ServerEvent::system(message)
    }

    #[tokio::test]
    async fn test_connect_without_token_closes() {
        let f = fixture().await;
        let (conn, mut rx) = open();

        assert_eq!(f.handler.connect(&conn, None).await, Flow::Close);
        assert_eq!(drain(&mut rx), vec![system(AUTH_REQUIRED)]);
        assert!(f.handler.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_connect_with_valid_token() {
        let f = fixture().await;
        let (conn, mut rx) = open();
        let token = f.codec.issue("alice").unwrap();

        assert_eq!(f.handler.connect(&conn, Some(&token)).await, Flow::Continue);
        assert_eq!(drain(&mut rx), vec![system("Welcome, alice!")]);
        assert_eq!(f.handler.sessions().resolve(conn.id()), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn test_connect_with_expired_token_leaves_no_session() {
        let f = fixture().await;
        let expired = TokenCodec::new(SECRET, Duration::seconds(-10))
            .issue("alice")
            .unwrap();
        let (conn, mut rx) = open();

        assert_eq!(f.handler.connect(&conn, Some(&expired)).await, Flow::Close);
        assert_eq!(drain(&mut rx), vec![system(TOKEN_EXPIRED)]);
        assert_eq!(f.handler.sessions().resolve(conn.id()), None);
    }

    #[tokio::test]
    async fn test_connect_with_foreign_or_unknown_user_token() {
        let f = fixture().await;

        let forged = TokenCodec::new("some-other-secret-entirely", Duration::hours(1))
            .issue("alice")
            .unwrap();
        let (conn, mut rx) = open();
        assert_eq!(f.handler.connect(&conn, Some(&forged)).await, Flow::Close);
        assert_eq!(drain(&mut rx), vec![system(INVALID_TOKEN)]);

        let ghost = f.codec.issue("mallory").unwrap();
        let (conn, mut rx) = open();
        assert_eq!(f.handler.connect(&conn, Some(&ghost)).await, Flow::Close);
        assert_eq!(drain(&mut rx), vec![system(INVALID_TOKEN)]);
    }

    #[tokio::test]
    async fn test_connect_store_failure() {
        let store = Arc::new(BrokenStore);
        let codec = TokenCodec::new(SECRET, Duration::hours(1));
        let handler = ConnectionHandler::new(
            Arc::new(SessionRegistry::new()),
            codec.clone(),
            store.clone(),
            store.clone(),
            Arc::new(Responder::new(store, ResponderConfig::default())),
        );
        let (conn, mut rx) = open();
        let token = codec.issue("alice").unwrap();

        assert_eq!(handler.connect(&conn, Some(&token)).await, Flow::Close);
        assert_eq!(drain(&mut rx), vec![system(CONNECTION_ERROR)]);
    }

    #[tokio::test]
    async fn test_unauthenticated_send_never_persists() {
        let f = fixture().await;
        let (conn, mut rx) = open();

        assert_eq!(f.handler.send_message(&conn, "hello").await, Flow::Continue);
        assert_eq!(drain(&mut rx), vec![system(NOT_AUTHENTICATED)]);
        assert!(f.store.all_for("alice").await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let f = fixture().await;
        let (conn, mut rx) = open();
        let token = f.codec.issue("alice").unwrap();
        f.handler.connect(&conn, Some(&token)).await;
        drain(&mut rx);

        f.handler.send_message(&conn, "   \n\t").await;
        assert_eq!(drain(&mut rx), vec![system(EMPTY_MESSAGE)]);
        assert!(f.store.all_for("alice").await.is_empty());
    }

    #[tokio::test]
    async fn test_send_persists_user_then_ai() {
        let f = fixture().await;
        let (conn, mut rx) = open();
        let token = f.codec.issue("alice").unwrap();
        f.handler.connect(&conn, Some(&token)).await;
        drain(&mut rx);

        assert_eq!(f.handler.send_message(&conn, "  hello  ").await, Flow::Continue);

        let records = f.store.all_for("alice").await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sender, Sender::User);
        assert_eq!(records[0].content, "hello");
        assert_eq!(records[1].sender, Sender::Ai);
        assert_eq!(records[1].content, "echo: hello");
        assert!(records[1].created_at >= records[0].created_at);

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![ServerEvent::chat(&records[0]), ServerEvent::chat(&records[1])]
        );
    }

    #[tokio::test]
    async fn test_append_failure_reports_processing_error() {
        let users = Arc::new(InMemoryStore::new());
        users
            .create_user(UserRecord::new("alice", "hash"))
            .await
            .unwrap();
        let broken = Arc::new(BrokenStore);
        let codec = TokenCodec::new(SECRET, Duration::hours(1));
        let handler = ConnectionHandler::new(
            Arc::new(SessionRegistry::new()),
            codec.clone(),
            users,
            broken.clone(),
            Arc::new(Responder::new(broken, ResponderConfig::default())),
        );
        let (conn, mut rx) = open();
        let token = codec.issue("alice").unwrap();
        handler.connect(&conn, Some(&token)).await;
        drain(&mut rx);

        assert_eq!(handler.send_message(&conn, "hello").await, Flow::Continue);
        assert_eq!(drain(&mut rx), vec![system(PROCESSING_ERROR)]);
        assert_eq!(
            handler.sessions().guard(conn.id()),
            AuthState::Authenticated("alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_invalid_reauthentication_keeps_session() {
        let f = fixture().await;
        let (conn, mut rx) = open();
        let token = f.codec.issue("alice").unwrap();
        f.handler.connect(&conn, Some(&token)).await;
        drain(&mut rx);

        assert_eq!(
            f.handler.authenticate(&conn, Some("garbage")).await,
            Flow::Continue
        );
        assert_eq!(drain(&mut rx), vec![system(INVALID_TOKEN)]);
        assert_eq!(f.handler.sessions().resolve(conn.id()), Some("alice".to_string()));

        f.handler.authenticate(&conn, None).await;
        assert_eq!(drain(&mut rx), vec![system(AUTH_REQUIRED)]);
        assert_eq!(f.handler.sessions().resolve(conn.id()), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn test_reauthentication_switches_user() {
        let f = fixture().await;
        let (conn, mut rx) = open();
        let alice = f.codec.issue("alice").unwrap();
        let bob = f.codec.issue("bob").unwrap();
        f.handler.connect(&conn, Some(&alice)).await;
        drain(&mut rx);

        f.handler.authenticate(&conn, Some(&bob)).await;
        assert_eq!(drain(&mut rx), vec![system("Authenticated as bob")]);
        assert_eq!(f.handler.sessions().resolve(conn.id()), Some("bob".to_string()));
        assert_eq!(f.handler.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_frame_dispatch() {
        let f = fixture().await;
        let (conn, mut rx) = open();
        let token = f.codec.issue("alice").unwrap();

        let frame = format!(r#"{{"event":"authenticate","data":{{"token":"{}"}}}}"#, token);
        assert_eq!(f.handler.handle_frame(&conn, &frame).await, Flow::Continue);
        assert_eq!(drain(&mut rx), vec![system("Authenticated as alice")]);

        f.handler
            .handle_frame(&conn, r#"{"event":"send_message","data":{"message":"hi"}}"#)
            .await;
        assert_eq!(drain(&mut rx).len(), 2);

        f.handler.handle_frame(&conn, "not json at all").await;
        assert_eq!(drain(&mut rx), vec![system(UNRECOGNIZED_EVENT)]);
    }

    #[tokio::test]
    async fn test_frames_without_data() {
        let f = fixture().await;
        let (conn, mut rx) = open();

        assert_eq!(
            f.handler.handle_frame(&conn, r#"{"event":"authenticate"}"#).await,
            Flow::Continue
        );
        assert_eq!(drain(&mut rx), vec![system(AUTH_REQUIRED)]);

        f.handler
            .handle_frame(&conn, r#"{"event":"authenticate","data":null}"#)
            .await;
        assert_eq!(drain(&mut rx), vec![system(AUTH_REQUIRED)]);

        let token = f.codec.issue("alice").unwrap();
        f.handler.connect(&conn, Some(&token)).await;
        drain(&mut rx);

        f.handler
            .handle_frame(&conn, r#"{"event":"send_message","data":{"message":null}}"#)
            .await;
        assert_eq!(drain(&mut rx), vec![system(EMPTY_MESSAGE)]);
        assert!(f.store.all_for("alice").await.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_unbinds() {
        let f = fixture().await;
        let (conn, _rx) = open();
        let token = f.codec.issue("alice").unwrap();
        f.handler.connect(&conn, Some(&token)).await;

        f.handler.disconnect(&conn);
        assert!(f.handler.sessions().is_empty());

        // anonymous disconnect is harmless
        let (anon, _rx) = open();
        f.handler.disconnect(&anon);
        assert!(f.handler.sessions().is_empty());
    }
}
