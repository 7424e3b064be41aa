//! Prediction refresh core
//!
//! This crate keeps a small set of tickers supplied with fresh price
//! predictions from two LLM providers. It includes:
//!
//! - Validated ticker symbols and normalized prediction records
//! - A shared prompt and tolerant response parsers
//! - Provider clients for OpenAI GPT and xAI Grok that never fail past their
//!   boundary
//! - An in-memory cache of the latest record per (symbol, provider)
//! - A periodic scheduler with bounded fan-out and a skip-if-running guard
//!
//! # Example
//!
//! ```rust,ignore
//! use ninja_predict::{PredictConfig, PredictionCache, Scheduler, build_clients};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(PredictConfig::from_env()?);
//!     let cache = PredictionCache::new(config.history_limit);
//!     let clients = build_clients(&config)?;
//!
//!     let scheduler = Scheduler::new(config, clients, cache.clone());
//!     let handle = scheduler.spawn(CancellationToken::new());
//!
//!     // Serve `cache` to readers...
//!     handle.await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod parse;
pub mod prompt;
pub mod record;
pub mod scheduler;
pub mod symbol;

// Re-export main types for convenience
pub use cache::PredictionCache;
pub use client::{
    CallPolicy, GptPredictionClient, GrokPredictionClient, PredictionClient, build_clients,
    build_clients_for,
};
pub use config::PredictConfig;
pub use error::{ErrorKind, PredictError, Result};
pub use record::{
    AssetType, CacheKey, Direction, PredictionRecord, PredictionRequest, Provider, RecordStatus,
};
pub use scheduler::{CycleOutcome, CycleReport, Scheduler, SchedulerState, SchedulerStatus};
pub use symbol::Symbol;
