//! Normalized prediction records
//!
//! Every provider answer, good or bad, ends up as one [`PredictionRecord`].
//! Records are immutable once built; a refresh produces a new record that
//! replaces the old one in the cache.

use crate::error::{ErrorKind, PredictError};
use crate::parse::ParsedPrediction;
use crate::symbol::Symbol;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Percentage move below which a prediction counts as flat
const FLAT_THRESHOLD_PCT: f64 = 0.1;

/// External prediction source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI GPT via the Responses API
    Gpt,
    /// xAI Grok via chat completions
    Grok,
}

impl Provider {
    /// All supported providers, in display order
    pub const ALL: [Provider; 2] = [Provider::Gpt, Provider::Grok];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpt => "gpt",
            Self::Grok => "grok",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpt" | "openai" => Ok(Self::Gpt),
            "grok" | "xai" => Ok(Self::Grok),
            other => Err(PredictError::Config(format!("unknown provider '{other}'"))),
        }
    }
}

/// Predicted price movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    /// Derive a direction from the percentage change between two prices.
    pub fn from_change_pct(pct: f64) -> Self {
        if pct.abs() < FLAT_THRESHOLD_PCT {
            Self::Flat
        } else if pct > 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }

    /// Interpret free-form model wording ("bullish", "sell", ...).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "up" | "bullish" | "buy" | "long" | "higher" => Some(Self::Up),
            "down" | "bearish" | "sell" | "short" | "lower" => Some(Self::Down),
            "flat" | "neutral" | "hold" | "sideways" | "unchanged" => Some(Self::Flat),
            _ => None,
        }
    }
}

/// Kind of asset the model believes the ticker is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Crypto,
}

impl AssetType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "stock" | "equity" | "etf" => Some(Self::Stock),
            "crypto" | "cryptocurrency" | "coin" | "token" => Some(Self::Crypto),
            _ => None,
        }
    }
}

/// Outcome of a single provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Ok,
    Error,
}

/// One (symbol, provider) call scheduled for a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub symbol: Symbol,
    pub provider: Provider,
    pub target_date: NaiveDate,
    pub requested_at: DateTime<Utc>,
}

impl PredictionRequest {
    pub fn new(symbol: Symbol, provider: Provider, target_date: NaiveDate) -> Self {
        Self {
            symbol,
            provider,
            target_date,
            requested_at: Utc::now(),
        }
    }
}

/// Cache key: at most one latest record per (symbol, provider)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub symbol: Symbol,
    pub provider: Provider,
}

impl CacheKey {
    pub fn new(symbol: Symbol, provider: Provider) -> Self {
        Self { symbol, provider }
    }
}

/// Normalized result of one provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub symbol: Symbol,
    pub provider: Provider,
    pub model: String,
    pub status: RecordStatus,
    pub direction: Option<Direction>,
    pub predicted_price: Option<f64>,
    pub current_price: Option<f64>,
    pub price_currency: Option<String>,
    pub price_timestamp: Option<String>,
    pub percentage_change: Option<f64>,
    pub asset_type: Option<AssetType>,
    pub target_date: NaiveDate,
    /// Model confidence in `0.0..=1.0`, when reported
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub raw_text: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub error_kind: Option<ErrorKind>,
    pub error_detail: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl PredictionRecord {
    /// Build a successful record from a parsed provider answer.
    pub fn from_parsed(
        request: &PredictionRequest,
        model: impl Into<String>,
        parsed: ParsedPrediction,
        raw_text: String,
        elapsed: Duration,
    ) -> Self {
        let percentage_change = parsed.percentage_change.or_else(|| {
            match (parsed.current_price, parsed.predicted_price) {
                (Some(current), Some(predicted)) if current > 0.0 => {
                    Some((predicted - current) / current * 100.0)
                }
                _ => None,
            }
        });
        let direction = parsed
            .direction
            .or_else(|| percentage_change.map(Direction::from_change_pct));

        Self {
            symbol: request.symbol.clone(),
            provider: request.provider,
            model: model.into(),
            status: RecordStatus::Ok,
            direction,
            predicted_price: parsed.predicted_price,
            current_price: parsed.current_price,
            price_currency: parsed.price_currency,
            price_timestamp: parsed.price_timestamp,
            percentage_change,
            asset_type: parsed.asset_type,
            target_date: request.target_date,
            confidence: parsed.confidence,
            reasoning: parsed.reasoning,
            raw_text: Some(raw_text),
            fetched_at: Utc::now(),
            elapsed_ms: duration_ms(elapsed),
            error_kind: None,
            error_detail: None,
            warnings: parsed.warnings,
        }
    }

    /// Build an error record. The call failed but the pair still gets an entry.
    pub fn failed(
        request: &PredictionRequest,
        model: impl Into<String>,
        error: &PredictError,
        raw_text: Option<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            symbol: request.symbol.clone(),
            provider: request.provider,
            model: model.into(),
            status: RecordStatus::Error,
            direction: None,
            predicted_price: None,
            current_price: None,
            price_currency: None,
            price_timestamp: None,
            percentage_change: None,
            asset_type: None,
            target_date: request.target_date,
            confidence: None,
            reasoning: None,
            raw_text,
            fetched_at: Utc::now(),
            elapsed_ms: duration_ms(elapsed),
            error_kind: Some(error.kind()),
            error_detail: Some(error.to_string()),
            warnings: Vec::new(),
        }
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.symbol.clone(), self.provider)
    }

    pub fn is_ok(&self) -> bool {
        self.status == RecordStatus::Ok
    }

    /// Whether the record is older than `max_age` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        (now - self.fetched_at)
            .to_std()
            .is_ok_and(|age| age > max_age)
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(symbol: &str, provider: Provider) -> PredictionRequest {
        PredictionRequest::new(
            Symbol::parse(symbol).unwrap(),
            provider,
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        )
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("gpt".parse::<Provider>().unwrap(), Provider::Gpt);
        assert_eq!("XAI".parse::<Provider>().unwrap(), Provider::Grok);
        assert!("claude".parse::<Provider>().is_err());
        assert_eq!(serde_json::to_string(&Provider::Grok).unwrap(), "\"grok\"");
    }

    #[test]
    fn test_direction_from_change() {
        assert_eq!(Direction::from_change_pct(2.5), Direction::Up);
        assert_eq!(Direction::from_change_pct(-0.5), Direction::Down);
        assert_eq!(Direction::from_change_pct(0.05), Direction::Flat);
        assert_eq!(Direction::from_label("Bullish"), Some(Direction::Up));
        assert_eq!(Direction::from_label("maybe"), None);
    }

    #[test]
    fn test_from_parsed_derives_change_and_direction() {
        let parsed = ParsedPrediction {
            current_price: Some(200.0),
            predicted_price: Some(210.0),
            reasoning: Some("earnings beat".to_string()),
            ..Default::default()
        };
        let record = PredictionRecord::from_parsed(
            &request("AAPL", Provider::Gpt),
            "gpt-5",
            parsed,
            "{}".to_string(),
            Duration::from_millis(1500),
        );

        assert!(record.is_ok());
        assert_eq!(record.direction, Some(Direction::Up));
        assert!((record.percentage_change.unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(record.elapsed_ms, 1500);
        assert!(record.error_kind.is_none());
    }

    #[test]
    fn test_explicit_direction_wins() {
        let parsed = ParsedPrediction {
            current_price: Some(100.0),
            predicted_price: Some(101.0),
            direction: Some(Direction::Flat),
            ..Default::default()
        };
        let record = PredictionRecord::from_parsed(
            &request("MSFT", Provider::Grok),
            "grok-4",
            parsed,
            String::new(),
            Duration::ZERO,
        );
        assert_eq!(record.direction, Some(Direction::Flat));
    }

    #[test]
    fn test_failed_record() {
        let err = PredictError::Timeout(Duration::from_secs(60));
        let record = PredictionRecord::failed(
            &request("TSLA", Provider::Grok),
            "grok-4",
            &err,
            None,
            Duration::from_secs(60),
        );
        assert_eq!(record.status, RecordStatus::Error);
        assert_eq!(record.error_kind, Some(ErrorKind::Network));
        assert!(record.error_detail.as_deref().unwrap().contains("timeout"));
        assert!(record.predicted_price.is_none());
        assert_eq!(record.key(), CacheKey::new(Symbol::parse("TSLA").unwrap(), Provider::Grok));
    }

    #[test]
    fn test_staleness() {
        let record = PredictionRecord::failed(
            &request("AAPL", Provider::Gpt),
            "gpt-5",
            &PredictError::Network("down".into()),
            None,
            Duration::ZERO,
        );
        let now = record.fetched_at;
        assert!(!record.is_stale(now, Duration::from_secs(300)));
        assert!(record.is_stale(now + chrono::Duration::seconds(301), Duration::from_secs(300)));
    }
}
