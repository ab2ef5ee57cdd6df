//! What went wrong with a provider call, and what to tell the user about it

use crate::llm::core::error::LlmError;
use crate::llm::openai::types::ErrorEnvelope;

pub const EMPTY_REPLY: &str = "I couldn't generate a response. Please try again.";
pub const AUTH_ERROR: &str = "AI configuration error: invalid API key.";
pub const MODEL_UNAVAILABLE: &str =
    "Requested AI model is not available. Please check the configured model.";
pub const CONFIG_OR_MODEL_ISSUE: &str = "AI configuration error or model issue.";
pub const SERVICE_ERROR: &str = "AI service error. Please try again.";
pub const FALLBACK_SERVICE_ERROR: &str = "Fallback AI service error. Please try again.";
pub const NOT_CONFIGURED: &str = "AI service is not configured. Please set API keys.";
pub const TIMED_OUT: &str = "AI service timed out. Please try again.";
pub const UNEXPECTED: &str = "An unexpected error occurred while generating a reply.";

/// Closed set of primary-provider failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rejected credentials (401)
    Auth,
    /// Model does not exist or is not accessible (404)
    UnknownModel,
    /// 429 whose body mentions quota exhaustion
    QuotaExceeded,
    /// Any other 429
    RateLimited,
    Timeout,
    /// Any other non-2xx status
    Service,
    /// Transport or decoding failures
    Unexpected,
}

/// Next step after a primary failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Stop and answer the user with this text
    Reply(&'static str),
    /// Ask the fallback provider
    Fallback,
}

pub fn classify(err: &LlmError) -> FailureKind {
    match err {
        LlmError::Timeout => FailureKind::Timeout,
        LlmError::HttpError { status: 401, .. } => FailureKind::Auth,
        LlmError::HttpError { status: 404, .. } => FailureKind::UnknownModel,
        LlmError::HttpError { status: 429, body } => {
            if mentions_quota(body) {
                FailureKind::QuotaExceeded
            } else {
                FailureKind::RateLimited
            }
        }
        LlmError::HttpError { .. } => FailureKind::Service,
        LlmError::Transport(_) | LlmError::SerializationError(_) => FailureKind::Unexpected,
    }
}

fn mentions_quota(body: &str) -> bool {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let error = envelope.error;
    error.code_or_type() == Some("insufficient_quota")
        || error
            .message
            .as_deref()
            .map(|m| m.to_lowercase().contains("quota"))
            .unwrap_or(false)
}

pub fn resolve(kind: FailureKind, fallback_available: bool) -> Resolution {
    match kind {
        FailureKind::Auth => Resolution::Reply(AUTH_ERROR),
        FailureKind::UnknownModel => Resolution::Reply(MODEL_UNAVAILABLE),
        FailureKind::QuotaExceeded | FailureKind::RateLimited if fallback_available => {
            Resolution::Fallback
        }
        FailureKind::QuotaExceeded | FailureKind::RateLimited => {
            Resolution::Reply(CONFIG_OR_MODEL_ISSUE)
        }
        FailureKind::Timeout => Resolution::Reply(TIMED_OUT),
        FailureKind::Service => Resolution::Reply(SERVICE_ERROR),
        FailureKind::Unexpected => Resolution::Reply(UNEXPECTED),
    }
}

/// The fallback is the last resort, so its failures map straight to text
pub fn fallback_failure_reply(err: &LlmError) -> &'static str {
    match err {
        LlmError::Timeout => TIMED_OUT,
        LlmError::HttpError { .. } => FALLBACK_SERVICE_ERROR,
        LlmError::Transport(_) | LlmError::SerializationError(_) => UNEXPECTED,
    }
}
