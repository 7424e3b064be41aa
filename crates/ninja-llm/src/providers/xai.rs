//! xAI Grok provider implementation
//!
//! This module implements the LLMProvider trait for xAI's Grok models using
//! the OpenAI-compatible chat completions endpoint plus xAI's live search
//! extension (`search_parameters`).
//! See: https://docs.x.ai/docs/api-reference#chat-completions

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, LiveSearch, Message, Result,
    Role, SearchMode, SearchSource, StopReason, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_XAI_API_BASE: &str = "https://api.x.ai/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the xAI provider
#[derive(Debug, Clone)]
pub struct XaiConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the xAI API (default: "https://api.x.ai/v1")
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl XaiConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_XAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// xAI Grok provider
pub struct XaiProvider {
    client: Client,
    config: XaiConfig,
}

impl XaiProvider {
    /// Create a new provider with custom configuration
    pub fn with_config(config: XaiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &XaiConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for XaiProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to xAI chat completions API");

        let model = request.model.clone();
        let body = build_chat_request(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(LLMError::from_transport)?;

        let status = response.status();
        let text = response.text().await.map_err(LLMError::from_transport)?;

        if !status.is_success() {
            return Err(LLMError::from_status(status.as_u16(), text, &model));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        let usage = parsed.usage.as_ref().map_or_else(TokenUsage::default, |u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        // Extract first choice (the API can return several but we ask for one)
        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            LLMError::UnexpectedResponse("No choices in response".to_string())
        })?;

        let text = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LLMError::UnexpectedResponse("Empty message content".to_string()))?;

        let stop_reason = map_stop_reason(choice.finish_reason.as_deref());

        debug!(
            "Received response - stop_reason: {:?}, tokens: {}/{}",
            stop_reason, usage.input_tokens, usage.output_tokens
        );

        Ok(CompletionResponse {
            text,
            model: parsed.model,
            stop_reason,
            usage,
        })
    }

    fn name(&self) -> &'static str {
        "xai"
    }
}

// ============================================================================
// xAI-specific request types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_parameters: Option<SearchParameters>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct SearchParameters {
    mode: SearchMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<SourceSpec>,
}

#[derive(Debug, Serialize)]
struct SourceSpec {
    #[serde(rename = "type")]
    source_type: &'static str,
}

// ============================================================================
// xAI-specific response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

// ============================================================================
// Conversion functions
// ============================================================================

fn build_chat_request(request: CompletionRequest) -> ChatRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.extend(
        request
            .messages
            .into_iter()
            .map(|Message { role, content }| ChatMessage {
                role: match role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                },
                content,
            }),
    );

    ChatRequest {
        model: request.model,
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        seed: request.seed,
        search_parameters: request.search.map(convert_search),
    }
}

fn convert_search(search: LiveSearch) -> SearchParameters {
    SearchParameters {
        mode: search.mode,
        sources: search
            .sources
            .into_iter()
            .map(|s| SourceSpec {
                source_type: match s {
                    SearchSource::Web => "web",
                    SearchSource::News => "news",
                    SearchSource::X => "x",
                },
            })
            .collect(),
    }
}

fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("stop") | None => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::ContentFilter,
        Some(other) => {
            debug!("Unknown stop reason: {}", other);
            StopReason::EndTurn
        }
    }
}
