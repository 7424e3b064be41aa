//! Console output for one-shot predictions

use chrono::NaiveDate;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use ninja_predict::{PredictionRecord, RecordStatus};
use serde::Serialize;
use std::time::Duration;

const NOT_AVAILABLE: &str = "N/A";

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

fn price(value: Option<f64>, currency: Option<&str>) -> String {
    match (value, currency) {
        (Some(v), Some(c)) => format!("{v:.2} {c}"),
        (Some(v), None) => format!("{v:.2}"),
        (None, _) => NOT_AVAILABLE.to_string(),
    }
}

fn seconds(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

/// Side-by-side comparison, one column per provider.
pub fn comparison_table(records: &[PredictionRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("Field")];
    header.extend(
        records
            .iter()
            .map(|r| Cell::new(format!("{} ({})", r.provider, r.model))),
    );
    table.set_header(header);

    let rows: [(&str, fn(&PredictionRecord) -> String); 11] = [
        ("Ticker", |r| r.symbol.to_string()),
        ("Status", |r| match r.status {
            RecordStatus::Ok => "ok".to_string(),
            RecordStatus::Error => format!("error ({})", or_na(r.error_kind)),
        }),
        ("Asset Type", |r| {
            or_na(r.asset_type.map(|a| format!("{a:?}").to_lowercase()))
        }),
        ("Current Price", |r| {
            price(r.current_price, r.price_currency.as_deref())
        }),
        ("Price Timestamp", |r| or_na(r.price_timestamp.as_deref())),
        ("Target Date", |r| r.target_date.to_string()),
        ("Predicted Price", |r| {
            price(r.predicted_price, r.price_currency.as_deref())
        }),
        ("Change %", |r| or_na(r.percentage_change.map(|p| format!("{p:+.2}")))),
        ("Direction", |r| {
            or_na(r.direction.map(|d| format!("{d:?}").to_lowercase()))
        }),
        ("Elapsed (s)", |r| seconds(r.elapsed_ms)),
        ("Reason", |r| {
            r.reasoning
                .clone()
                .or_else(|| r.error_detail.clone())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        }),
    ];

    for (label, render) in rows {
        let mut row = vec![Cell::new(label)];
        row.extend(records.iter().map(|r| Cell::new(render(r))));
        table.add_row(row);
    }
    table
}

/// Human-readable report including total runtime
pub fn render_text(records: &[PredictionRecord], overall: Duration) -> String {
    let mut out = comparison_table(records).to_string();
    for record in records.iter().filter(|r| !r.warnings.is_empty()) {
        out.push_str(&format!(
            "\n{} warnings: {}",
            record.provider,
            record.warnings.join("; ")
        ));
    }
    out.push_str(&format!("\n\nTotal runtime (s): {:.3}", overall.as_secs_f64()));
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    ticker: &'a str,
    target_date: NaiveDate,
    overall_elapsed_seconds: f64,
    results: &'a [PredictionRecord],
}

/// Single JSON object with every record and the total runtime
pub fn render_json(
    ticker: &str,
    target_date: NaiveDate,
    records: &[PredictionRecord],
    overall: Duration,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        ticker,
        target_date,
        overall_elapsed_seconds: (overall.as_secs_f64() * 1000.0).round() / 1000.0,
        results: records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ninja_predict::parse::ParsedPrediction;
    use ninja_predict::{PredictError, PredictionRequest, Provider, Symbol};

    fn records() -> Vec<PredictionRecord> {
        let date = NaiveDate::from_ymd_opt(2025, 9, 19).unwrap();
        let gpt_request = PredictionRequest::new(Symbol::parse("TSLA").unwrap(), Provider::Gpt, date);
        let grok_request =
            PredictionRequest::new(Symbol::parse("TSLA").unwrap(), Provider::Grok, date);
        vec![
            PredictionRecord::from_parsed(
                &gpt_request,
                "gpt-5",
                ParsedPrediction {
                    current_price: Some(396.1),
                    predicted_price: Some(410.0),
                    price_currency: Some("USD".to_string()),
                    reasoning: Some("Delivery numbers beat.".to_string()),
                    ..Default::default()
                },
                String::new(),
                Duration::from_millis(41_250),
            ),
            PredictionRecord::failed(
                &grok_request,
                "grok-4",
                &PredictError::Timeout(Duration::from_secs(60)),
                None,
                Duration::from_secs(60),
            ),
        ]
    }

    #[test]
    fn test_text_report() {
        let text = render_text(&records(), Duration::from_millis(60_123));
        assert!(text.contains("gpt (gpt-5)"));
        assert!(text.contains("grok (grok-4)"));
        assert!(text.contains("410.00 USD"));
        assert!(text.contains("41.250"));
        assert!(text.contains("error (network)"));
        assert!(text.contains("Total runtime (s): 60.123"));
    }

    #[test]
    fn test_json_report() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 19).unwrap();
        let json = render_json("TSLA", date, &records(), Duration::from_millis(60_123)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["ticker"], "TSLA");
        assert_eq!(value["overall_elapsed_seconds"], 60.123);
        assert_eq!(value["results"].as_array().unwrap().len(), 2);
        assert_eq!(value["results"][1]["status"], "error");
    }
}
