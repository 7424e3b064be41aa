//! Logging and tracing utilities

use std::str::FromStr;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, one event per line
    #[default]
    Pretty,
    /// Newline-delimited JSON, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected 'pretty' or 'json')")),
        }
    }
}

/// Initialize tracing subscriber with default configuration
///
/// Reads `RUST_LOG` for the filter (default `info`) and `LOG_FORMAT` for the
/// output format (default pretty).
pub fn init_tracing() {
    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    init_tracing_with(format, "info");
}

/// Initialize tracing with an explicit format and a fallback filter used when
/// `RUST_LOG` is not set.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing_with(format: LogFormat, default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}
