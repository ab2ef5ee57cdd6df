// Shared application state handed to every route

use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::llm::Responder;
use crate::session::{ConnectionHandler, SessionRegistry};
use crate::store::{CredentialStore, MessageStore};

#[derive(Clone)]
pub struct AppState {
    pub codec: TokenCodec,
    pub credentials: Arc<dyn CredentialStore>,
    pub messages: Arc<dyn MessageStore>,
    pub connections: ConnectionHandler,
    /// Name of the storage backend, reported by the health check
    pub backend: &'static str,
}

impl AppState {
    pub fn new(
        codec: TokenCodec,
        credentials: Arc<dyn CredentialStore>,
        messages: Arc<dyn MessageStore>,
        responder: Responder,
        backend: &'static str,
    ) -> Self {
        let connections = ConnectionHandler::new(
            Arc::new(SessionRegistry::new()),
            codec.clone(),
            Arc::clone(&credentials),
            Arc::clone(&messages),
            Arc::new(responder),
        );

        Self {
            codec,
            credentials,
            messages,
            connections,
            backend,
        }
    }
}
