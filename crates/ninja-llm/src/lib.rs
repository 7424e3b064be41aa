//! LLM provider abstraction layer for prediction-ninja
//!
//! This crate provides provider-agnostic abstractions for asking a Large
//! Language Model a single question and getting its text answer back. It
//! includes:
//!
//! - Message types for LLM communication
//! - Completion request/response types
//! - Live web search settings for providers that ground answers on search
//! - Provider trait for LLM implementations
//! - Concrete provider implementations (behind feature flags)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod search;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;
pub use search::{LiveSearch, SearchMode, SearchSource};

// Provider implementations (feature-gated)
#[cfg(any(feature = "openai", feature = "xai"))]
pub mod providers;
