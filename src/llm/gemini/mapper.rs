//! Mapping between neutral types and Gemini types

use crate::llm::core::{
    config::GenerationConfig,
    types::{ChatRequest, ChatRole, ChatTurn},
};

use super::types::{Content, GeminiGenerationConfig, GenerateContentRequest, GenerateContentResponse, Part};

/// Convert a chat request into Gemini's contents shape.
///
/// Gemini only knows `user` and `model`; every non-user turn, the system
/// frame included, is sent as `model`. Turns with empty content are dropped.
pub fn to_gemini_request(request: &ChatRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: request
            .turns
            .iter()
            .filter(|turn| !turn.content.is_empty())
            .map(to_gemini_content)
            .collect(),
        generation_config: to_gemini_generation_config(&request.config),
    }
}

fn to_gemini_content(turn: &ChatTurn) -> Content {
    let role = match turn.role {
        ChatRole::User => "user",
        ChatRole::Assistant | ChatRole::System => "model",
    };

    Content {
        role: role.to_string(),
        parts: vec![Part::text(turn.content.clone())],
    }
}

fn to_gemini_generation_config(config: &GenerationConfig) -> GeminiGenerationConfig {
    GeminiGenerationConfig {
        temperature: config.temperature,
        max_output_tokens: config.max_tokens,
    }
}

/// Text of the first part of the first candidate, if any
pub fn from_gemini_response(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}
