//! Completion request and response types

use crate::{LiveSearch, Message};
use serde::{Deserialize, Serialize};

/// Request for a single LLM completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (provider-specific)
    pub model: String,

    /// Conversation messages
    pub messages: Vec<Message>,

    /// Optional system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Maximum tokens to generate; providers use their own default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Sampling temperature (0.0-2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Sampling seed for providers that support reproducible output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Reasoning effort hint ("low", "medium", "high") for reasoning models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,

    /// Live web search settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<LiveSearch>,
}

/// Response from LLM completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text from the assistant
    pub text: String,

    /// Model that produced the answer, as reported by the provider
    pub model: Option<String>,

    /// Stop reason (completed, max_tokens, etc.)
    pub stop_reason: StopReason,

    /// Token usage statistics
    pub usage: TokenUsage,
}

/// Reason the LLM stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural completion (end of turn)
    EndTurn,

    /// Hit max tokens limit
    MaxTokens,

    /// Output withheld by the provider's content filter
    ContentFilter,

    /// Provider reported the response as incomplete for another reason
    Incomplete,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    pub input_tokens: usize,

    /// Number of output tokens
    pub output_tokens: usize,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

impl CompletionRequest {
    /// Create a builder for completion requests
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(model)
    }
}

/// Builder for CompletionRequest
pub struct CompletionRequestBuilder {
    model: String,
    messages: Vec<Message>,
    system: Option<String>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
    seed: Option<u64>,
    reasoning_effort: Option<String>,
    search: Option<LiveSearch>,
}

impl CompletionRequestBuilder {
    /// Create a new builder
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            max_tokens: None,
            temperature: None,
            seed: None,
            reasoning_effort: None,
            search: None,
        }
    }

    /// Add a single message
    pub fn add_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the maximum tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the sampling seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the reasoning effort hint
    pub fn reasoning_effort(mut self, effort: impl Into<String>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }

    /// Enable live search
    pub fn search(mut self, search: LiveSearch) -> Self {
        self.search = Some(search);
        self
    }

    /// Build the completion request
    pub fn build(self) -> CompletionRequest {
        CompletionRequest {
            model: self.model,
            messages: self.messages,
            system: self.system,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            seed: self.seed,
            reasoning_effort: self.reasoning_effort,
            search: self.search,
        }
    }
}
