//! OpenAI provider implementation
//!
//! This module implements the LLMProvider trait on top of OpenAI's Responses
//! API, which is what GPT-5 class models with built-in web search expect.
//! See: https://platform.openai.com/docs/api-reference/responses
//!
//! # Examples
//!
//! ```no_run
//! use ninja_llm::{CompletionRequest, LLMProvider, LiveSearch, Message};
//! use ninja_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OpenAIConfig::new("sk-...").with_timeout(60);
//!     let provider = OpenAIProvider::with_config(config)?;
//!
//!     let request = CompletionRequest::builder("gpt-5")
//!         .system("Return ONLY one JSON object.")
//!         .add_message(Message::user("Predict TSLA for Friday"))
//!         .reasoning_effort("medium")
//!         .search(LiveSearch::default())
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.text);
//!     Ok(())
//! }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result, Role,
    StopReason, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the OpenAI API (default: "https://api.openai.com/v1")
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
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

/// OpenAI provider
///
/// Talks to the Responses endpoint so reasoning models can use the built-in
/// `web_search` tool. Temperature is forwarded only when the request sets it;
/// GPT-5 rejects it, so callers leave it unset for that family.
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to OpenAI Responses API");

        let model = request.model.clone();
        let body = build_responses_request(request);

        let response = self
            .client
            .post(format!("{}/responses", self.config.api_base))
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

        let parsed: ResponsesResponse = serde_json::from_str(&text).map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        if let Some(error) = &parsed.error {
            if !error.is_null() {
                return Err(LLMError::ProviderError(error.to_string()));
            }
        }

        let stop_reason = map_stop_reason(&parsed);
        let usage = parsed.usage.as_ref().map_or_else(TokenUsage::default, |u| TokenUsage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        });
        let reported_model = parsed.model.clone();

        let text = extract_output_text(parsed).ok_or_else(|| {
            LLMError::UnexpectedResponse("Response contained no output text".to_string())
        })?;

        debug!(
            "Received response - stop_reason: {:?}, tokens: {}/{}",
            stop_reason, usage.input_tokens, usage.output_tokens
        );

        Ok(CompletionResponse {
            text,
            model: reported_model,
            stop_reason,
            usage,
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ============================================================================
// OpenAI-specific request types
// ============================================================================

#[derive(Debug, Serialize)]
struct ResponsesRequest {
    model: String,
    input: Vec<InputMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ResponsesTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct InputMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponsesTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Reasoning {
    effort: String,
}

// ============================================================================
// OpenAI-specific response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<ResponsesUsage>,
    #[serde(default)]
    incomplete_details: Option<IncompleteDetails>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponsesUsage {
    #[serde(default)]
    input_tokens: usize,
    #[serde(default)]
    output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct IncompleteDetails {
    #[serde(default)]
    reason: Option<String>,
}

// ============================================================================
// Conversion functions
// ============================================================================

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Build a Responses API body from our generic request
///
/// The system prompt becomes the first input message.
fn build_responses_request(request: CompletionRequest) -> ResponsesRequest {
    let mut input = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system {
        input.push(InputMessage {
            role: "system",
            content: system,
        });
    }
    input.extend(request.messages.into_iter().map(|Message { role, content }| {
        InputMessage {
            role: role_name(role),
            content,
        }
    }));

    let tools = match &request.search {
        Some(search) if search.is_enabled() => vec![ResponsesTool {
            tool_type: "web_search",
        }],
        _ => Vec::new(),
    };

    ResponsesRequest {
        model: request.model,
        input,
        tools,
        reasoning: request.reasoning_effort.map(|effort| Reasoning { effort }),
        max_output_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

/// Pull the assistant text out of a Responses payload
///
/// Prefers the aggregated `output_text` field and falls back to joining the
/// `output_text` parts of every `message` output item.
fn extract_output_text(response: ResponsesResponse) -> Option<String> {
    if let Some(text) = response.output_text.filter(|t| !t.trim().is_empty()) {
        return Some(text);
    }

    let parts: Vec<String> = response
        .output
        .into_iter()
        .filter(|item| item.item_type == "message")
        .flat_map(|item| item.content)
        .filter(|c| c.content_type == "output_text")
        .filter_map(|c| c.text)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

fn map_stop_reason(response: &ResponsesResponse) -> StopReason {
    match response.status.as_deref() {
        Some("completed") | None => StopReason::EndTurn,
        Some("incomplete") => match response
            .incomplete_details
            .as_ref()
            .and_then(|d| d.reason.as_deref())
        {
            Some("max_output_tokens") => StopReason::MaxTokens,
            Some("content_filter") => StopReason::ContentFilter,
            _ => StopReason::Incomplete,
        },
        Some(other) => {
            warn!("Unknown response status: {}", other);
            StopReason::Incomplete
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LiveSearch;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::with_config(OpenAIConfig::new("test-key")).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.config().api_key, "test-key");
        assert_eq!(provider.config().api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn test_custom_config() {
        let config = OpenAIConfig::new("k")
            .with_api_base("https://proxy.example.com/v1/")
            .with_timeout(45);
        let provider = OpenAIProvider::with_config(config).unwrap();
        assert_eq!(provider.config().api_base, "https://proxy.example.com/v1");
        assert_eq!(provider.config().timeout_secs, 45);
    }

    #[test]
    fn test_request_body_shape() {
        let request = CompletionRequest::builder("gpt-5")
            .system("sys")
            .add_message(Message::user("predict TSLA"))
            .reasoning_effort("medium")
            .search(LiveSearch::default())
            .build();

        let body = serde_json::to_value(build_responses_request(request)).unwrap();
        assert_eq!(body["model"], "gpt-5");
        assert_eq!(body["input"][0]["role"], "system");
        assert_eq!(body["input"][1]["content"], "predict TSLA");
        assert_eq!(body["tools"][0]["type"], "web_search");
        assert_eq!(body["reasoning"]["effort"], "medium");
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_output_tokens").is_none());
    }

    #[test]
    fn test_extract_prefers_output_text() {
        let response: ResponsesResponse = serde_json::from_value(serde_json::json!({
            "status": "completed",
            "output_text": "{\"ticker\":\"TSLA\"}",
            "output": []
        }))
        .unwrap();
        assert_eq!(
            extract_output_text(response).as_deref(),
            Some("{\"ticker\":\"TSLA\"}")
        );
    }

    #[test]
    fn test_extract_from_output_items() {
        let response: ResponsesResponse = serde_json::from_value(serde_json::json!({
            "status": "completed",
            "output": [
                {"type": "web_search_call", "id": "ws_1", "status": "completed"},
                {"type": "reasoning", "summary": []},
                {"type": "message", "role": "assistant", "content": [
                    {"type": "output_text", "text": "part one", "annotations": []},
                    {"type": "output_text", "text": "part two"}
                ]}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }))
        .unwrap();
        assert_eq!(
            extract_output_text(response).as_deref(),
            Some("part one\npart two")
        );
    }

    #[test]
    fn test_extract_none_when_empty() {
        let response: ResponsesResponse =
            serde_json::from_value(serde_json::json!({"output": []})).unwrap();
        assert!(extract_output_text(response).is_none());
    }

    #[test]
    fn test_stop_reason_mapping() {
        let incomplete: ResponsesResponse = serde_json::from_value(serde_json::json!({
            "status": "incomplete",
            "incomplete_details": {"reason": "max_output_tokens"}
        }))
        .unwrap();
        assert_eq!(map_stop_reason(&incomplete), StopReason::MaxTokens);

        let done: ResponsesResponse =
            serde_json::from_value(serde_json::json!({"status": "completed"})).unwrap();
        assert_eq!(map_stop_reason(&done), StopReason::EndTurn);
    }
}
