//! JSON shapes served to the dashboard

use chrono::{DateTime, NaiveDate, Utc};
use ninja_predict::{
    AssetType, Direction, PredictionRecord, Provider, RecordStatus, SchedulerStatus, Symbol,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Entry status as seen by clients. `pending` means no data yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Ok,
    Error,
    Pending,
}

impl From<RecordStatus> for EntryStatus {
    fn from(status: RecordStatus) -> Self {
        match status {
            RecordStatus::Ok => Self::Ok,
            RecordStatus::Error => Self::Error,
        }
    }
}

/// One (symbol, provider) prediction as served over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEntry {
    pub symbol: String,
    pub provider: Provider,
    pub model: String,
    pub status: EntryStatus,
    pub direction: Option<Direction>,
    pub confidence: Option<f64>,
    pub predicted_price: Option<f64>,
    pub current_price: Option<f64>,
    pub price_currency: Option<String>,
    pub percentage_change: Option<f64>,
    pub asset_type: Option<AssetType>,
    pub target_date: Option<NaiveDate>,
    pub reasoning: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub elapsed_ms: Option<u64>,
    pub error_detail: Option<String>,
    /// Older than one refresh interval
    pub stale: bool,
}

impl PredictionEntry {
    pub fn from_record(record: &PredictionRecord, now: DateTime<Utc>, max_age: Duration) -> Self {
        Self {
            symbol: record.symbol.to_string(),
            provider: record.provider,
            model: record.model.clone(),
            status: record.status.into(),
            direction: record.direction,
            confidence: record.confidence,
            predicted_price: record.predicted_price,
            current_price: record.current_price,
            price_currency: record.price_currency.clone(),
            percentage_change: record.percentage_change,
            asset_type: record.asset_type,
            target_date: Some(record.target_date),
            reasoning: record.reasoning.clone(),
            fetched_at: Some(record.fetched_at),
            elapsed_ms: Some(record.elapsed_ms),
            error_detail: record.error_detail.clone(),
            stale: record.is_stale(now, max_age),
        }
    }

    /// Placeholder for a pair that has not been refreshed yet
    pub fn pending(symbol: &Symbol, provider: Provider, model: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            provider,
            model: model.into(),
            status: EntryStatus::Pending,
            direction: None,
            confidence: None,
            predicted_price: None,
            current_price: None,
            price_currency: None,
            percentage_change: None,
            asset_type: None,
            target_date: None,
            reasoning: None,
            fetched_at: None,
            elapsed_ms: None,
            error_detail: None,
            stale: false,
        }
    }
}

/// History of one provider for one symbol, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHistory {
    pub provider: Provider,
    pub entries: Vec<PredictionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub symbol: String,
    pub providers: Vec<ProviderHistory>,
}

/// Service health and refresh progress
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub symbols: Vec<String>,
    pub providers: Vec<Provider>,
    pub cached_entries: usize,
    pub scheduler: SchedulerStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ninja_predict::{PredictError, PredictionRequest};

    fn record() -> PredictionRecord {
        let request = PredictionRequest::new(
            Symbol::parse("TSLA").unwrap(),
            Provider::Grok,
            NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
        );
        PredictionRecord::failed(
            &request,
            "grok-4",
            &PredictError::Timeout(Duration::from_secs(60)),
            None,
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_entry_round_trip() {
        let record = record();
        let entry = PredictionEntry::from_record(&record, record.fetched_at, Duration::from_secs(300));

        let json = serde_json::to_string(&entry).unwrap();
        let back: PredictionEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(back.symbol, "TSLA");
        assert_eq!(back.provider, Provider::Grok);
        assert_eq!(back.status, EntryStatus::Error);
        assert_eq!(back.fetched_at, Some(record.fetched_at));
        assert_eq!(back, entry);
    }

    #[test]
    fn test_entry_json_shape() {
        let record = record();
        let later = record.fetched_at + chrono::Duration::seconds(600);
        let value =
            serde_json::to_value(PredictionEntry::from_record(&record, later, Duration::from_secs(300)))
                .unwrap();

        assert_eq!(value["status"], "error");
        assert_eq!(value["provider"], "grok");
        assert_eq!(value["stale"], true);
        assert!(value["error_detail"].as_str().unwrap().contains("timeout"));
        assert!(value["predicted_price"].is_null());
    }

    #[test]
    fn test_pending_entry() {
        let entry = PredictionEntry::pending(&Symbol::parse("AAPL").unwrap(), Provider::Gpt, "gpt-5");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "pending");
        assert!(value["fetched_at"].is_null());
        assert_eq!(value["stale"], false);
    }
}
