//! Provider trait for chat completion backends

use async_trait::async_trait;

use super::{error::LlmError, types::ChatRequest};

/// Interface every AI provider client satisfies
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Generate a single, non-streamed reply.
    ///
    /// Returns the raw generated text, which may be empty when the provider
    /// produced nothing usable. Non-2xx answers come back as
    /// `LlmError::HttpError` with the response body intact so callers can
    /// classify them.
    async fn generate(&self, request: &ChatRequest) -> Result<String, LlmError>;
}
