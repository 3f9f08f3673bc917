//! The chat-completions HTTP implementation of [`CompletionApi`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use printvendo_types::constants::{
    COMPLETION_FREQUENCY_PENALTY, COMPLETION_MAX_TOKENS, COMPLETION_PRESENCE_PENALTY,
    COMPLETION_TEMPERATURE, COMPLETION_TOP_P,
};

use crate::error::{CompletionError, Result};
use crate::types::{ChatMessage, ChatOutcome, TokenUsage};

/// One request/response round trip against the completion service.
///
/// Implementations carry no retry or continuation logic; that lives in
/// [`crate::CompletionClient`].
#[async_trait]
pub trait CompletionApi: Send + Sync {
    /// Send a conversation, get back one response chunk with usage.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatOutcome>;
}

/// Connection settings for the OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API base, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model name sent with every request.
    pub model: String,
}

impl OpenAiConfig {
    /// Config for the public endpoint with the baseline chat model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: "gpt-3.5-turbo".to_string(),
        }
    }

    /// Point at a different host (testing, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a different model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Completion service backed by an OpenAI-compatible chat endpoint.
pub struct OpenAiApi {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiApi {
    /// Create an API client over a shared HTTP client.
    pub fn new(client: Client, config: OpenAiConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl CompletionApi for OpenAiApi {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatOutcome> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = Request {
            model: &self.config.model,
            messages,
            temperature: COMPLETION_TEMPERATURE,
            max_tokens: COMPLETION_MAX_TOKENS,
            top_p: COMPLETION_TOP_P,
            frequency_penalty: COMPLETION_FREQUENCY_PENALTY,
            presence_penalty: COMPLETION_PRESENCE_PENALTY,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, message });
        }

        let payload: Response = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;
        from_response(payload)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ResponseUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ResponseUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

fn from_response(response: Response) -> Result<ChatOutcome> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| CompletionError::Malformed("response carries no message content".into()))?;

    let usage = response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(ChatOutcome { text, usage })
}
