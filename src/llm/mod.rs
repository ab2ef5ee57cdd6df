//! AI provider layer
//!
//! A small provider abstraction with two implementations (OpenAI chat
//! completions as primary, Gemini as fallback) and the responder pipeline
//! that chooses between them.

pub mod core;
pub mod gemini;
pub mod openai;
pub mod responder;

pub use core::{
    config::GenerationConfig,
    error::LlmError,
    provider::ChatProvider,
    types::{ChatRequest, ChatRole, ChatTurn},
};

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use responder::{FailureKind, Responder, ResponderConfig};
