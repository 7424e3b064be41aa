//! Configuration for prediction refresh

use crate::error::{PredictError, Result};
use crate::record::Provider;
use crate::symbol::Symbol;
use chrono::{Days, NaiveDate};
use ninja_utils::{env_list, env_opt, env_or, env_parse};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_XAI_API_BASE: &str = "https://api.x.ai/v1";

/// Configuration for the provider clients and the refresh scheduler
#[derive(Clone)]
pub struct PredictConfig {
    /// Tickers refreshed every cycle
    pub symbols: Vec<Symbol>,

    pub openai_api_key: String,
    pub openai_api_base: String,
    /// OpenAI model id (default "gpt-5")
    pub openai_model: String,

    pub xai_api_key: String,
    pub xai_api_base: String,
    /// xAI model id (default "grok-4")
    pub xai_model: String,

    /// Grok sampling temperature
    pub temperature: f32,

    /// Grok sampling seed
    pub seed: u64,

    /// Fixed prediction date; when unset, `today + target_horizon_days`
    pub target_date: Option<NaiveDate>,
    pub target_horizon_days: u32,

    /// Time between refresh cycles
    pub refresh_interval: Duration,

    /// Upper bound on a single provider call
    pub request_timeout: Duration,

    /// Provider calls allowed in flight at once
    pub max_concurrent_calls: usize,

    /// Outbound requests per minute per provider, 0 disables the limiter
    pub requests_per_minute: u32,

    /// Records kept per (symbol, provider) history
    pub history_limit: usize,
}

impl fmt::Debug for PredictConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictConfig")
            .field("symbols", &self.symbols)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_api_base", &self.openai_api_base)
            .field("openai_model", &self.openai_model)
            .field("xai_api_key", &redact(&self.xai_api_key))
            .field("xai_api_base", &self.xai_api_base)
            .field("xai_model", &self.xai_model)
            .field("temperature", &self.temperature)
            .field("seed", &self.seed)
            .field("target_date", &self.target_date)
            .field("target_horizon_days", &self.target_horizon_days)
            .field("refresh_interval", &self.refresh_interval)
            .field("request_timeout", &self.request_timeout)
            .field("max_concurrent_calls", &self.max_concurrent_calls)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() { "<unset>" } else { "<redacted>" }
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            openai_api_key: String::new(),
            openai_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            openai_model: "gpt-5".to_string(),
            xai_api_key: String::new(),
            xai_api_base: DEFAULT_XAI_API_BASE.to_string(),
            xai_model: "grok-4".to_string(),
            temperature: 0.2,
            seed: 12345,
            target_date: None,
            target_horizon_days: 7,
            refresh_interval: Duration::from_secs(300), // 5 minutes
            request_timeout: Duration::from_secs(60),
            max_concurrent_calls: Provider::ALL.len(),
            requests_per_minute: 20,
            history_limit: 20,
        }
    }
}

impl PredictConfig {
    /// Create a new configuration builder
    pub fn builder() -> PredictConfigBuilder {
        PredictConfigBuilder::default()
    }

    /// Load configuration from the process environment.
    ///
    /// Missing symbols or credentials are configuration errors, which the
    /// server treats as fatal.
    pub fn from_env() -> Result<Self> {
        let symbols = env_list("SYMBOLS")
            .iter()
            .map(|s| Symbol::parse(s))
            .collect::<Result<Vec<_>>>()?;
        let config = Self::load_env(symbols)?;
        config.validate()?;
        Ok(config)
    }

    /// Load everything but the symbol list from the environment, requiring
    /// credentials only for `providers`.
    ///
    /// Used by one-shot runs that call a single provider.
    pub fn from_env_for(symbols: Vec<Symbol>, providers: &[Provider]) -> Result<Self> {
        let config = Self::load_env(symbols)?;
        config.validate_for(providers)?;
        Ok(config)
    }

    fn load_env(symbols: Vec<Symbol>) -> Result<Self> {
        let defaults = Self::default();

        let target_date = env_opt("TARGET_DATE")
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                    PredictError::Config(format!("TARGET_DATE '{raw}' is not YYYY-MM-DD: {e}"))
                })
            })
            .transpose()?;

        let config = Self {
            symbols: dedup(symbols),
            openai_api_key: env_opt("OPENAI_API_KEY").unwrap_or_default(),
            openai_api_base: env_or("OPENAI_API_BASE", DEFAULT_OPENAI_API_BASE),
            openai_model: env_or("MODEL_OPENAI", &defaults.openai_model),
            xai_api_key: env_opt("XAI_API_KEY").unwrap_or_default(),
            xai_api_base: env_or("XAI_API_BASE", DEFAULT_XAI_API_BASE),
            xai_model: env_or("MODEL_XAI", &defaults.xai_model),
            temperature: env_parse("TEMPERATURE", defaults.temperature)?,
            seed: env_parse("SEED", defaults.seed)?,
            target_date,
            target_horizon_days: env_parse("TARGET_HORIZON_DAYS", defaults.target_horizon_days)?,
            refresh_interval: Duration::from_secs(env_parse(
                "REFRESH_INTERVAL_SECS",
                defaults.refresh_interval.as_secs(),
            )?),
            request_timeout: Duration::from_secs(env_parse(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            max_concurrent_calls: env_parse("MAX_CONCURRENT_CALLS", defaults.max_concurrent_calls)?,
            requests_per_minute: env_parse(
                "PROVIDER_REQUESTS_PER_MINUTE",
                defaults.requests_per_minute,
            )?,
            history_limit: env_parse("HISTORY_LIMIT", defaults.history_limit)?,
        };
        Ok(config)
    }

    /// Validate the configuration for a server that refreshes every provider
    pub fn validate(&self) -> Result<()> {
        self.validate_for(&Provider::ALL)
    }

    /// Validate the configuration, checking credentials and endpoints only
    /// for `providers`.
    pub fn validate_for(&self, providers: &[Provider]) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(PredictError::Config(
                "at least one symbol is required (SYMBOLS)".to_string(),
            ));
        }
        if providers.is_empty() {
            return Err(PredictError::Config(
                "at least one provider is required".to_string(),
            ));
        }
        if providers.contains(&Provider::Gpt) {
            if self.openai_api_key.trim().is_empty() {
                return Err(PredictError::Config(
                    "OPENAI_API_KEY environment variable not set".to_string(),
                ));
            }
            validate_api_base("OPENAI_API_BASE", &self.openai_api_base)?;
        }
        if providers.contains(&Provider::Grok) {
            if self.xai_api_key.trim().is_empty() {
                return Err(PredictError::Config(
                    "XAI_API_KEY environment variable not set".to_string(),
                ));
            }
            validate_api_base("XAI_API_BASE", &self.xai_api_base)?;
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(PredictError::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.refresh_interval.is_zero() {
            return Err(PredictError::Config(
                "refresh interval must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(PredictError::Config(
                "request timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent_calls == 0 {
            return Err(PredictError::Config(
                "max_concurrent_calls must be greater than 0".to_string(),
            ));
        }
        if self.history_limit == 0 {
            return Err(PredictError::Config(
                "history_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Date predictions are made for, relative to `today`.
    pub fn target_date_for(&self, today: NaiveDate) -> NaiveDate {
        self.target_date.unwrap_or_else(|| {
            today
                .checked_add_days(Days::new(u64::from(self.target_horizon_days)))
                .unwrap_or(today)
        })
    }

    /// Model id configured for a provider
    pub fn model_for(&self, provider: Provider) -> &str {
        match provider {
            Provider::Gpt => &self.openai_model,
            Provider::Grok => &self.xai_model,
        }
    }

    /// Whether `symbol` is in the configured set
    pub fn is_configured(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }
}

fn validate_api_base(name: &str, base: &str) -> Result<()> {
    let url = url::Url::parse(base)
        .map_err(|e| PredictError::Config(format!("{name} '{base}' is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PredictError::Config(format!(
            "{name} must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(())
}

fn dedup(symbols: Vec<Symbol>) -> Vec<Symbol> {
    let mut seen = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        if !seen.contains(&symbol) {
            seen.push(symbol);
        }
    }
    seen
}

/// Builder for PredictConfig
#[derive(Debug, Default)]
pub struct PredictConfigBuilder {
    symbols: Vec<Symbol>,
    openai_api_key: Option<String>,
    openai_api_base: Option<String>,
    openai_model: Option<String>,
    xai_api_key: Option<String>,
    xai_api_base: Option<String>,
    xai_model: Option<String>,
    temperature: Option<f32>,
    seed: Option<u64>,
    target_date: Option<NaiveDate>,
    target_horizon_days: Option<u32>,
    refresh_interval: Option<Duration>,
    request_timeout: Option<Duration>,
    max_concurrent_calls: Option<usize>,
    requests_per_minute: Option<u32>,
    history_limit: Option<usize>,
}

impl PredictConfigBuilder {
    /// Add a symbol to refresh
    pub fn symbol(mut self, symbol: Symbol) -> Self {
        self.symbols.push(symbol);
        self
    }

    /// Replace the symbol list
    pub fn symbols(mut self, symbols: impl IntoIterator<Item = Symbol>) -> Self {
        self.symbols = symbols.into_iter().collect();
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn openai_api_base(mut self, base: impl Into<String>) -> Self {
        self.openai_api_base = Some(base.into());
        self
    }

    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.openai_model = Some(model.into());
        self
    }

    pub fn xai_api_key(mut self, key: impl Into<String>) -> Self {
        self.xai_api_key = Some(key.into());
        self
    }

    pub fn xai_api_base(mut self, base: impl Into<String>) -> Self {
        self.xai_api_base = Some(base.into());
        self
    }

    pub fn xai_model(mut self, model: impl Into<String>) -> Self {
        self.xai_model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn target_date(mut self, date: NaiveDate) -> Self {
        self.target_date = Some(date);
        self
    }

    pub fn target_horizon_days(mut self, days: u32) -> Self {
        self.target_horizon_days = Some(days);
        self
    }

    /// Set refresh interval
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn max_concurrent_calls(mut self, max: usize) -> Self {
        self.max_concurrent_calls = Some(max);
        self
    }

    pub fn requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = Some(rpm);
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PredictConfig> {
        let defaults = PredictConfig::default();

        let config = PredictConfig {
            symbols: dedup(self.symbols),
            openai_api_key: self.openai_api_key.unwrap_or(defaults.openai_api_key),
            openai_api_base: self.openai_api_base.unwrap_or(defaults.openai_api_base),
            openai_model: self.openai_model.unwrap_or(defaults.openai_model),
            xai_api_key: self.xai_api_key.unwrap_or(defaults.xai_api_key),
            xai_api_base: self.xai_api_base.unwrap_or(defaults.xai_api_base),
            xai_model: self.xai_model.unwrap_or(defaults.xai_model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            seed: self.seed.unwrap_or(defaults.seed),
            target_date: self.target_date.or(defaults.target_date),
            target_horizon_days: self.target_horizon_days.unwrap_or(defaults.target_horizon_days),
            refresh_interval: self.refresh_interval.unwrap_or(defaults.refresh_interval),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            max_concurrent_calls: self.max_concurrent_calls.unwrap_or(defaults.max_concurrent_calls),
            requests_per_minute: self.requests_per_minute.unwrap_or(defaults.requests_per_minute),
            history_limit: self.history_limit.unwrap_or(defaults.history_limit),
        };

        config.validate()?;
        Ok(config)
    }
}
