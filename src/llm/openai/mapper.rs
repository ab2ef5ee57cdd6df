//! Mapping between neutral types and Chat Completions types

use crate::llm::core::types::{ChatRequest, ChatTurn};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

pub fn to_openai_request(model: &str, request: &ChatRequest) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: request.turns.iter().map(to_openai_message).collect(),
        max_tokens: request.config.max_tokens,
        temperature: request.config.temperature,
    }
}

fn to_openai_message(turn: &ChatTurn) -> ChatMessage {
    ChatMessage {
        role: turn.role.as_str().to_string(),
        content: Some(turn.content.clone()),
    }
}

/// Text of the first choice, empty when absent
pub fn from_openai_response(response: ChatCompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default()
}
