//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Request did not complete in time
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Provider-specific error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LLMError {
    /// Classify a transport failure from `reqwest`, separating timeouts from
    /// other connection problems.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::HttpError(err)
        }
    }

    /// Map a non-success HTTP status returned by a provider.
    pub fn from_status(status: u16, body: String, model: &str) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed,
            429 => Self::RateLimitExceeded(body),
            400 | 422 => Self::InvalidRequest(body),
            404 => Self::ModelNotFound(model.to_string()),
            408 | 504 => Self::Timeout(format!("HTTP {status}: {body}")),
            _ => Self::RequestFailed(format!("HTTP {status}: {body}")),
        }
    }

    /// Whether the failure was a timeout, either client side or reported by
    /// the provider.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::HttpError(e) => e.is_timeout(),
            _ => false,
        }
    }
}
