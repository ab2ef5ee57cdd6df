//! Reply generation with primary/fallback providers
//!
//! `Responder::reply` rebuilds a bounded conversation window from the message
//! store, asks the primary provider, and drops to the fallback provider only
//! when the primary reports quota exhaustion or rate limiting. Every failure
//! resolves to user-facing text; `reply` itself cannot fail.

pub mod classify;

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::llm::core::{
    config::GenerationConfig,
    error::LlmError,
    provider::ChatProvider,
    types::{ChatRequest, ChatTurn},
};
use crate::store::{MessageStore, StoreError};

use classify::{classify, fallback_failure_reply, resolve, Resolution};
pub use classify::FailureKind;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant in a chat application. \
Keep responses concise, friendly, and engaging.";

/// Longest provider error body written to the log
const LOGGED_BODY_LIMIT: usize = 400;

/// Tunables for the reply pipeline
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Number of most recent records sent as context
    pub window_size: usize,
    /// Bound on each provider request
    pub request_timeout: Duration,
    /// Pause before the single retry after a primary 429
    pub retry_backoff: Duration,
    pub system_prompt: String,
    pub generation: GenerationConfig,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            request_timeout: Duration::from_secs(20),
            retry_backoff: Duration::from_millis(1500),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            generation: GenerationConfig::default(),
        }
    }
}

pub struct Responder {
    store: Arc<dyn MessageStore>,
    primary: Option<Arc<dyn ChatProvider>>,
    fallback: Option<Arc<dyn ChatProvider>>,
    config: ResponderConfig,
}

impl Responder {
    pub fn new(store: Arc<dyn MessageStore>, config: ResponderConfig) -> Self {
        Self {
            store,
            primary: None,
            fallback: None,
            config,
        }
    }

    pub fn with_primary(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.primary = Some(provider);
        self
    }

    pub fn with_fallback(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    /// Produce a reply for the user's latest turn. Never fails.
    pub async fn reply(&self, username: &str) -> String {
        let request = match self.conversation(username).await {
            Ok(request) => request,
            Err(e) => {
                error!(username = %username, error = %e, "failed to load conversation window");
                return classify::UNEXPECTED.to_string();
            }
        };

        match (&self.primary, &self.fallback) {
            (Some(primary), _) => self.ask_primary(primary.as_ref(), &request).await,
            (None, Some(fallback)) => self.ask_fallback(fallback.as_ref(), &request).await,
            (None, None) => classify::NOT_CONFIGURED.to_string(),
        }
    }

    /// System frame followed by the window, oldest first
    pub async fn conversation(&self, username: &str) -> Result<ChatRequest, StoreError> {
        let mut recent = self
            .store
            .recent_for(username, self.config.window_size)
            .await?;
        recent.reverse();

        let mut turns = Vec::with_capacity(recent.len() + 1);
        turns.push(ChatTurn::system(self.config.system_prompt.clone()));
        turns.extend(recent.iter().map(ChatTurn::from));

        Ok(ChatRequest::new(turns, self.config.generation.clone()))
    }

    async fn call(
        &self,
        provider: &dyn ChatProvider,
        request: &ChatRequest,
    ) -> Result<String, LlmError> {
        tokio::time::timeout(self.config.request_timeout, provider.generate(request)).await?
    }

    async fn ask_primary(&self, primary: &dyn ChatProvider, request: &ChatRequest) -> String {
        let mut result = self.call(primary, request).await;

        if matches!(&result, Err(e) if e.status() == Some(429)) {
            info!(
                provider = primary.name(),
                backoff_ms = self.config.retry_backoff.as_millis() as u64,
                "rate limited, retrying once"
            );
            tokio::time::sleep(self.config.retry_backoff).await;
            result = self.call(primary, request).await;
        }

        let err = match result {
            Ok(text) => return finish(text),
            Err(err) => err,
        };

        log_failure(primary.name(), &err);
        let kind = classify(&err);

        match resolve(kind, self.fallback.is_some()) {
            Resolution::Reply(text) => text.to_string(),
            Resolution::Fallback => match &self.fallback {
                Some(fallback) => {
                    info!(
                        primary = primary.name(),
                        fallback = fallback.name(),
                        kind = ?kind,
                        "falling back to secondary provider"
                    );
                    self.ask_fallback(fallback.as_ref(), request).await
                }
                None => classify::CONFIG_OR_MODEL_ISSUE.to_string(),
            },
        }
    }

    async fn ask_fallback(&self, fallback: &dyn ChatProvider, request: &ChatRequest) -> String {
        match self.call(fallback, request).await {
            Ok(text) => finish(text),
            Err(err) => {
                log_failure(fallback.name(), &err);
                fallback_failure_reply(&err).to_string()
            }
        }
    }
}

fn finish(text: String) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        classify::EMPTY_REPLY.to_string()
    } else {
        trimmed.to_string()
    }
}

fn log_failure(provider: &str, err: &LlmError) {
    match err {
        LlmError::HttpError { status, body } => {
            let body: String = body.chars().take(LOGGED_BODY_LIMIT).collect();
            error!(provider, status, body = %body, "provider API error");
        }
        LlmError::Timeout => warn!(provider, "provider request timed out"),
        other => error!(provider, error = %other, "provider request failed"),
    }
}
