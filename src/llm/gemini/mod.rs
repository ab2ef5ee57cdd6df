//! Gemini provider implementation (fallback)
//!
//! Talks to the public Generative Language API with an API key and
//! implements the `ChatProvider` trait.

pub mod client;
pub mod mapper;
pub mod types;

pub use client::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
