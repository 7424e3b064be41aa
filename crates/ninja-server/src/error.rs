//! API error responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by every endpoint
///
/// ```json
/// {"code": "UNKNOWN_SYMBOL", "message": "symbol NVDA is not tracked", "timestamp": 1756130400}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
    pub timestamp: i64,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Well-formed ticker that is not in the configured set
    #[error("symbol {0} is not tracked")]
    UnknownSymbol(String),

    /// Ticker that fails validation
    #[error("{0}")]
    InvalidSymbol(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::UnknownSymbol(_) => StatusCode::NOT_FOUND,
            Self::InvalidSymbol(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::UnknownSymbol(_) => "UNKNOWN_SYMBOL",
            Self::InvalidSymbol(_) => "INVALID_SYMBOL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse::new(self.code(), self.to_string());
        (self.status(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
