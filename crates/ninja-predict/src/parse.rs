//! Response parsing
//!
//! Models are asked for one JSON object but do not always comply: answers
//! arrive wrapped in code fences, with prose around the object, with numbers
//! written as `"$1,234.50"`, or (Grok) as a single
//! `TICKER|CURRENT_PRICE|TARGET_PRICE|PERCENTAGE_CHANGE` line. The parsers
//! here recover what they can and record schema drift as warnings instead of
//! failing, as long as a prediction can still be read.

use crate::error::{PredictError, Result};
use crate::record::{AssetType, Direction, PredictionRequest};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::warn;

static NUMBER_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"[-+]?\d[\d,]*(?:\.\d+)?|[-+]?\.\d+").expect("number pattern is valid")
});

const EXPECTED_FIELDS: [&str; 7] = [
    "ticker",
    "asset_type",
    "current_price",
    "price_currency",
    "price_timestamp",
    "predicted_price",
    "reasoning",
];

const KNOWN_FIELDS: [&str; 11] = [
    "ticker",
    "asset_type",
    "current_price",
    "price_currency",
    "price_timestamp",
    "target_date",
    "predicted_price",
    "reasoning",
    "direction",
    "confidence",
    "percentage_change",
];

/// Fields recovered from a model answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPrediction {
    pub ticker: Option<String>,
    pub asset_type: Option<AssetType>,
    pub current_price: Option<f64>,
    pub price_currency: Option<String>,
    pub price_timestamp: Option<String>,
    pub target_date: Option<String>,
    pub predicted_price: Option<f64>,
    pub percentage_change: Option<f64>,
    pub direction: Option<Direction>,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub warnings: Vec<String>,
}

/// Pull the outermost JSON object out of free text.
///
/// Takes everything from the first `{` to the last `}`, so code fences and
/// surrounding prose are ignored.
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let slice = match (start, end) {
        (Some(s), Some(e)) if e > s => &raw[s..=e],
        _ => return Err(PredictError::Parse("no JSON object in response".to_string())),
    };

    match serde_json::from_str::<Value>(slice) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(PredictError::Parse("response JSON is not an object".to_string())),
        Err(e) => Err(PredictError::Parse(format!("invalid JSON in response: {e}"))),
    }
}

/// Parse a JSON-object answer.
pub fn parse_json_prediction(raw: &str, request: &PredictionRequest) -> Result<ParsedPrediction> {
    let object = extract_json_object(raw)?;
    let mut parsed = ParsedPrediction::default();

    for field in EXPECTED_FIELDS {
        if object.get(field).is_none_or(Value::is_null) {
            parsed.warnings.push(format!("missing field '{field}'"));
        }
    }
    let unknown: Vec<&str> = object
        .keys()
        .map(String::as_str)
        .filter(|k| !KNOWN_FIELDS.contains(k))
        .collect();
    if !unknown.is_empty() {
        parsed
            .warnings
            .push(format!("unexpected field(s): {}", unknown.join(", ")));
    }

    parsed.ticker = string_field(&object, "ticker");
    parsed.price_currency = string_field(&object, "price_currency");
    parsed.price_timestamp = string_field(&object, "price_timestamp");
    parsed.target_date = string_field(&object, "target_date");
    parsed.reasoning = string_field(&object, "reasoning");
    parsed.current_price = number_field(&object, "current_price", &mut parsed.warnings);
    parsed.predicted_price = number_field(&object, "predicted_price", &mut parsed.warnings);
    parsed.percentage_change = number_field(&object, "percentage_change", &mut parsed.warnings);

    if let Some(label) = string_field(&object, "asset_type") {
        parsed.asset_type = AssetType::from_label(&label);
        if parsed.asset_type.is_none() {
            parsed.warnings.push(format!("unrecognized asset_type '{label}'"));
        }
    }
    if let Some(label) = string_field(&object, "direction") {
        parsed.direction = Direction::from_label(&label);
        if parsed.direction.is_none() {
            parsed.warnings.push(format!("unrecognized direction '{label}'"));
        }
    }
    if let Some(value) = object.get("confidence").filter(|v| !v.is_null()) {
        match lenient_number(value) {
            Some(c) => parsed.confidence = Some(normalize_confidence(c)),
            None => parsed.warnings.push(format!("unreadable confidence {value}")),
        }
    }

    if parsed.predicted_price.is_none() && parsed.direction.is_none() {
        return Err(PredictError::Parse(
            "response has neither predicted_price nor direction".to_string(),
        ));
    }

    check_consistency(&mut parsed, request);
    Ok(parsed)
}

/// Parse the compact `TICKER|CURRENT|TARGET|PCT` line.
pub fn parse_pipe_prediction(raw: &str, request: &PredictionRequest) -> Result<ParsedPrediction> {
    let line = raw
        .lines()
        .map(|l| l.trim().trim_matches('`').trim())
        .find(|l| l.matches('|').count() >= 3)
        .ok_or_else(|| PredictError::Parse("no pipe-delimited line in response".to_string()))?;

    let parts: Vec<&str> = line.split('|').map(str::trim).collect();
    let mut parsed = ParsedPrediction {
        ticker: Some(parts[0].to_string()).filter(|t| !t.is_empty()),
        ..Default::default()
    };
    if parts.len() > 4 {
        parsed
            .warnings
            .push(format!("pipe line has {} fields, expected 4", parts.len()));
    }

    parsed.current_price = number_from_str(parts[1]);
    parsed.predicted_price = number_from_str(parts[2]);
    parsed.percentage_change = number_from_str(parts[3]);

    if parsed.predicted_price.is_none() {
        return Err(PredictError::Parse(format!(
            "unreadable target price '{}'",
            parts[2]
        )));
    }
    if parsed.current_price.is_none() {
        parsed.warnings.push(format!("unreadable current price '{}'", parts[1]));
    }
    parsed.warnings.push("pipe format answer, no reasoning".to_string());

    check_consistency(&mut parsed, request);
    Ok(parsed)
}

/// Try the JSON object first, then the pipe line.
pub fn parse_flexible(raw: &str, request: &PredictionRequest) -> Result<ParsedPrediction> {
    match parse_json_prediction(raw, request) {
        Ok(parsed) => Ok(parsed),
        Err(json_err) => parse_pipe_prediction(raw, request).map_err(|pipe_err| {
            PredictError::Parse(format!("{json_err}; {pipe_err}"))
        }),
    }
}

/// Log accumulated drift once per answer.
pub(crate) fn log_drift(parsed: &ParsedPrediction, request: &PredictionRequest) {
    if !parsed.warnings.is_empty() {
        warn!(
            symbol = %request.symbol,
            provider = %request.provider,
            warnings = ?parsed.warnings,
            "Response schema drift"
        );
    }
}

fn check_consistency(parsed: &mut ParsedPrediction, request: &PredictionRequest) {
    if let Some(ticker) = &parsed.ticker {
        if !ticker.eq_ignore_ascii_case(request.symbol.as_str()) {
            parsed.warnings.push(format!(
                "ticker mismatch: asked for {}, got {ticker}",
                request.symbol
            ));
        }
    }
    if let Some(date) = &parsed.target_date {
        let expected = request.target_date.format("%Y-%m-%d").to_string();
        if !date.starts_with(&expected) {
            parsed
                .warnings
                .push(format!("target_date mismatch: asked for {expected}, got {date}"));
        }
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn number_field(object: &Map<String, Value>, key: &str, warnings: &mut Vec<String>) -> Option<f64> {
    let value = object.get(key).filter(|v| !v.is_null())?;
    let number = lenient_number(value);
    if number.is_none() {
        warnings.push(format!("unreadable {key} {value}"));
    }
    number
}

fn lenient_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => number_from_str(s),
        _ => None,
    }
}

/// Read the first number in a string such as `"$1,234.50"` or `"+3.5%"`.
fn number_from_str(s: &str) -> Option<f64> {
    NUMBER_RE
        .find(s)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .filter(|n: &f64| n.is_finite())
}

/// Accept both `0.72` and `72` style confidences.
fn normalize_confidence(value: f64) -> f64 {
    let scaled = if value > 1.0 { value / 100.0 } else { value };
    scaled.clamp(0.0, 1.0)
}
