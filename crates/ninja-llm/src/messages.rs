//! Message types for LLM communication
//!
//! Predictions are single-turn: one system instruction and one user prompt.
//! Both provider APIs accept the same `{role, content}` pair, so messages are
//! plain text here.

use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// System message
    System,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Message text
    pub content: String,
}

impl Message {
    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Text content of the message
    pub fn text(&self) -> &str {
        &self.content
    }
}
