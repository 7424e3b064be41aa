//! Prediction prompt
//!
//! Both providers receive the same instructions. The user message is a
//! MiniJinja template so the ticker and dates are interpolated in one place.

use crate::error::{PredictError, Result};
use crate::symbol::Symbol;
use chrono::NaiveDate;
use minijinja::{Environment, context};
use std::sync::LazyLock;

/// System message sent ahead of the rendered prompt
pub const SYSTEM_PROMPT: &str = "You are a markets researcher. You may use web_search to ground facts. \
Return ONLY one JSON object per the schema in the user's instructions.";

const PREDICTION_TEMPLATE: &str = r#"You are a markets researcher. The user provides a single ticker that may be either a STOCK (e.g., TSLA) or a CRYPTO asset (e.g., BTC, ETH).

1) Determine the asset type (exactly "stock" or "crypto").
2) Fetch the current live price **yourself** using reliable sources. Include currency (e.g., "USD") and an ISO 8601 timestamp for when that price is valid.
3) Provide a single, most-likely predicted price for {{ target_date }}.
4) Provide a concise, single-paragraph reason summarizing the key drivers behind your prediction.

Ticker: {{ ticker }}
Today: {{ today }}

STRICT OUTPUT RULES: return ONLY one JSON object with this exact schema (no extra text):
{
  "ticker": "{{ ticker }}",
  "asset_type": "stock" | "crypto",
  "current_price": <number>,
  "price_currency": "<ISO code, e.g., USD>",
  "price_timestamp": "<ISO8601 datetime>",
  "target_date": "{{ target_date }}",
  "predicted_price": <number>,
  "reasoning": "<single paragraph>"
}
{%- if pipe_fallback %}

If you cannot produce JSON, reply with exactly one line: {{ ticker }}|CURRENT_PRICE|TARGET_PRICE|PERCENTAGE_CHANGE
{%- endif %}"#;

static TEMPLATES: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_template("prediction", PREDICTION_TEMPLATE)
        .expect("prediction template is valid");
    env
});

/// Render the user prompt for one ticker.
///
/// `pipe_fallback` appends the one-line alternative format, which only the
/// Grok parser understands.
pub fn render_prediction_prompt(
    symbol: &Symbol,
    target_date: NaiveDate,
    today: NaiveDate,
    pipe_fallback: bool,
) -> Result<String> {
    let template = TEMPLATES
        .get_template("prediction")
        .map_err(|e| PredictError::Config(format!("prompt template: {e}")))?;

    template
        .render(context! {
            ticker => symbol.as_str(),
            target_date => target_date.format("%Y-%m-%d").to_string(),
            today => today.format("%Y-%m-%d").to_string(),
            pipe_fallback => pipe_fallback,
        })
        .map(|s| s.trim().to_string())
        .map_err(|e| PredictError::Config(format!("prompt render: {e}")))
}
