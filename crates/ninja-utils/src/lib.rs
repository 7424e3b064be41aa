//! Shared utilities for prediction-ninja
//!
//! This crate provides the functionality every other crate in the workspace
//! leans on: tracing setup and typed access to environment configuration.

pub mod env;
pub mod logging;

pub use env::{EnvError, env_list, env_opt, env_or, env_parse, load_dotenv};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
