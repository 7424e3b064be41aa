//! Error types for prediction operations

use ninja_llm::LLMError;
use ninja_utils::EnvError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Prediction specific errors
#[derive(Debug, Error)]
pub enum PredictError {
    /// Connection failure, provider outage or throttling
    #[error("network error: {0}")]
    Network(String),

    /// The call did not finish within the configured bound
    #[error("request timeout after {0:?}")]
    Timeout(Duration),

    /// Invalid or missing API key
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Response did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Ticker failed validation
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
}

/// Result type alias for prediction operations
pub type Result<T> = std::result::Result<T, PredictError>;

/// Coarse failure category carried on error records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Auth,
    Parse,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Auth => "auth",
            Self::Parse => "parse",
            Self::Config => "config",
        };
        f.write_str(s)
    }
}

impl PredictError {
    /// Category of this error. Timeouts count as network failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::Timeout(_) => ErrorKind::Network,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Config(_) | Self::InvalidSymbol(_) => ErrorKind::Config,
        }
    }
}

impl From<LLMError> for PredictError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::AuthenticationFailed => Self::Auth(err.to_string()),
            LLMError::ConfigurationError(msg) => Self::Auth(msg),
            LLMError::UnexpectedResponse(msg) => Self::Parse(msg),
            LLMError::SerializationError(e) => Self::Parse(e.to_string()),
            // Keep the word "timeout" in the detail whatever the source said
            LLMError::Timeout(msg) => Self::Network(format!("timeout: {msg}")),
            other if other.is_timeout() => Self::Network(format!("timeout: {other}")),
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<EnvError> for PredictError {
    fn from(err: EnvError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PredictError::InvalidSymbol("BAD TICKER".to_string());
        assert_eq!(err.to_string(), "invalid symbol: BAD TICKER");

        let err = PredictError::Timeout(Duration::from_secs(60));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(PredictError::Timeout(Duration::from_millis(5)).kind(), ErrorKind::Network);
        assert_eq!(PredictError::Auth("x".into()).kind(), ErrorKind::Auth);
        assert_eq!(PredictError::Parse("x".into()).kind(), ErrorKind::Parse);
        assert_eq!(PredictError::InvalidSymbol("x".into()).kind(), ErrorKind::Config);
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: PredictError = LLMError::AuthenticationFailed.into();
        assert_eq!(err.kind(), ErrorKind::Auth);

        let err: PredictError = LLMError::Timeout("after 30s".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.to_string().contains("timeout"));

        let err: PredictError = LLMError::UnexpectedResponse("no choices".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err: PredictError = LLMError::RateLimitExceeded("slow down".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn test_env_error_conversion() {
        let err: PredictError = EnvError::Invalid {
            key: "API_PORT".to_string(),
            value: "eighty".to_string(),
            reason: "invalid digit found in string".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("API_PORT"));
    }
}
