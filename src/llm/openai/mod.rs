//! OpenAI provider implementation (primary)

pub mod client;
pub mod mapper;
pub mod types;

pub use client::{OpenAiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
