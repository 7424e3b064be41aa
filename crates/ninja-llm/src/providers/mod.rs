//! Concrete LLM provider implementations
//!
//! This module contains implementations of the LLMProvider trait for
//! the two services predictions are requested from.

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "xai")]
pub mod xai;

#[cfg(feature = "openai")]
pub use openai::{OpenAIConfig, OpenAIProvider};

#[cfg(feature = "xai")]
pub use xai::{XaiConfig, XaiProvider};
