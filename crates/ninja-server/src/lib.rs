//! HTTP API over the prediction cache
//!
//! The router never calls an LLM; it only reads what the background
//! scheduler last stored.

pub mod config;
pub mod dto;
pub mod error;
pub mod report;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use routes::create_router;
pub use state::AppState;
