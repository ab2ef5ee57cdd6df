//! Gemini `generateContent` client (fallback provider)

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use crate::llm::core::{
    error::LlmError,
    provider::ChatProvider,
    types::ChatRequest,
};

use super::mapper::{from_gemini_response, to_gemini_request};
use super::types::GenerateContentResponse;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Client for the Gemini API authenticated with an API key
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LlmError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Endpoint without the key; the key travels as a query parameter
    fn build_endpoint_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = to_gemini_request(request);

        let response = self
            .http_client
            .post(self.build_endpoint_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::HttpError {
                status: status.as_u16(),
                body: text,
            });
        }

        // A body we cannot read counts as "nothing generated"
        match serde_json::from_str::<GenerateContentResponse>(&text) {
            Ok(parsed) => Ok(from_gemini_response(parsed).unwrap_or_default()),
            Err(e) => {
                warn!(error = %e, "Gemini returned an undecodable body");
                Ok(String::new())
            }
        }
    }
}
