//! HTTP handlers
//!
//! Handlers only read the cache; none of them calls a provider.

use crate::dto::{HistoryResponse, PredictionEntry, ProviderHistory, StatusResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use ninja_predict::Symbol;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the API router with tracing and permissive CORS.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/predictions", get(list_predictions))
        .route("/predictions/{symbol}", get(symbol_predictions))
        .route("/predictions/{symbol}/history", get(symbol_history))
        .route("/api/status", get(service_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn resolve_symbol(state: &AppState, raw: &str) -> ApiResult<Symbol> {
    let symbol = Symbol::parse(raw).map_err(|e| ApiError::InvalidSymbol(e.to_string()))?;
    if state.config.is_configured(&symbol) {
        Ok(symbol)
    } else {
        Err(ApiError::UnknownSymbol(symbol.to_string()))
    }
}

/// GET /predictions
async fn list_predictions(State(state): State<AppState>) -> Json<Vec<PredictionEntry>> {
    let now = Utc::now();
    let max_age = state.config.refresh_interval;
    let entries = state
        .cache
        .get_all()
        .await
        .iter()
        .map(|record| PredictionEntry::from_record(record, now, max_age))
        .collect();
    Json(entries)
}

/// GET /predictions/{symbol}
///
/// One entry per provider; providers without data yet are `pending`.
async fn symbol_predictions(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Vec<PredictionEntry>>> {
    let symbol = resolve_symbol(&state, &raw)?;
    let now = Utc::now();
    let max_age = state.config.refresh_interval;

    let mut entries = Vec::with_capacity(state.providers.len());
    for &provider in state.providers.iter() {
        let entry = match state.cache.get(&symbol, provider).await {
            Some(record) => PredictionEntry::from_record(&record, now, max_age),
            None => PredictionEntry::pending(&symbol, provider, state.config.model_for(provider)),
        };
        entries.push(entry);
    }
    Ok(Json(entries))
}

/// GET /predictions/{symbol}/history
async fn symbol_history(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let symbol = resolve_symbol(&state, &raw)?;
    let now = Utc::now();
    let max_age = state.config.refresh_interval;

    let mut providers = Vec::with_capacity(state.providers.len());
    for &provider in state.providers.iter() {
        let entries = state
            .cache
            .history(&symbol, provider)
            .await
            .iter()
            .map(|record| PredictionEntry::from_record(record, now, max_age))
            .collect();
        providers.push(ProviderHistory { provider, entries });
    }

    Ok(Json(HistoryResponse {
        symbol: symbol.to_string(),
        providers,
    }))
}

/// GET /api/status
async fn service_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        service: "prediction-ninja",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        symbols: state.config.symbols.iter().map(ToString::to_string).collect(),
        providers: state.providers.to_vec(),
        cached_entries: state.cache.len().await,
        scheduler: state.scheduler.status().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::EntryStatus;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use ninja_predict::parse::ParsedPrediction;
    use ninja_predict::{
        PredictConfig, PredictError, PredictionCache, PredictionClient, PredictionRecord,
        PredictionRequest, Provider, Scheduler,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Answers instantly with a fixed price
    struct FixedClient(Provider);

    #[async_trait]
    impl PredictionClient for FixedClient {
        fn provider(&self) -> Provider {
            self.0
        }

        async fn predict(&self, request: PredictionRequest) -> PredictionRecord {
            ok_record(&request, 250.0)
        }
    }

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn request(symbol: &str, provider: Provider) -> PredictionRequest {
        PredictionRequest::new(sym(symbol), provider, NaiveDate::from_ymd_opt(2025, 9, 19).unwrap())
    }

    fn ok_record(request: &PredictionRequest, price: f64) -> PredictionRecord {
        let parsed = ParsedPrediction {
            current_price: Some(240.0),
            predicted_price: Some(price),
            reasoning: Some("steady demand".to_string()),
            ..Default::default()
        };
        PredictionRecord::from_parsed(request, "test-model", parsed, String::new(), Duration::ZERO)
    }

    fn state() -> AppState {
        let config = Arc::new(
            PredictConfig::builder()
                .symbol(sym("AAPL"))
                .symbol(sym("TSLA"))
                .openai_api_key("sk-test")
                .xai_api_key("xai-test")
                .build()
                .unwrap(),
        );
        let scheduler = Scheduler::new(
            Arc::clone(&config),
            vec![Arc::new(FixedClient(Provider::Gpt)), Arc::new(FixedClient(Provider::Grok))],
            PredictionCache::default(),
        );
        AppState::new(config, scheduler)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_empty_cache_lists_nothing() {
        let (status, body) = get(create_router(state()), "/predictions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_scenario_with_one_timeout() {
        let state = state();
        let cache = state.cache.clone();
        cache.put(ok_record(&request("AAPL", Provider::Gpt), 231.0)).await;
        cache.put(ok_record(&request("AAPL", Provider::Grok), 229.0)).await;
        cache.put(ok_record(&request("TSLA", Provider::Gpt), 410.0)).await;
        cache
            .put(PredictionRecord::failed(
                &request("TSLA", Provider::Grok),
                "grok-4",
                &PredictError::Timeout(Duration::from_secs(60)),
                None,
                Duration::from_secs(60),
            ))
            .await;

        let (status, body) = get(create_router(state), "/predictions").await;
        assert_eq!(status, StatusCode::OK);

        let entries: Vec<PredictionEntry> = serde_json::from_value(body).unwrap();
        assert_eq!(entries.len(), 4);
        let tsla_grok = entries
            .iter()
            .find(|e| e.symbol == "TSLA" && e.provider == Provider::Grok)
            .unwrap();
        assert_eq!(tsla_grok.status, EntryStatus::Error);
        assert!(tsla_grok.error_detail.as_deref().unwrap().contains("timeout"));
        assert_eq!(
            entries.iter().filter(|e| e.status == EntryStatus::Ok).count(),
            3
        );
    }

    #[tokio::test]
    async fn test_symbol_shows_pending_providers() {
        let state = state();
        state.cache.put(ok_record(&request("AAPL", Provider::Gpt), 231.0)).await;

        let (status, body) = get(create_router(state), "/predictions/aapl").await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["provider"], "gpt");
        assert_eq!(entries[0]["status"], "ok");
        assert_eq!(entries[1]["provider"], "grok");
        assert_eq!(entries[1]["status"], "pending");
        assert_eq!(entries[1]["model"], "grok-4");
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_symbols() {
        let (status, body) = get(create_router(state()), "/predictions/NVDA").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_SYMBOL");

        let (status, body) = get(create_router(state()), "/predictions/bad%20ticker").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SYMBOL");
    }

    #[tokio::test]
    async fn test_cycle_then_read() {
        let state = state();
        state.scheduler.run_cycle().await;

        let (status, body) = get(create_router(state.clone()), "/predictions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 4);

        let (_, body) = get(create_router(state), "/api/status").await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cached_entries"], 4);
        assert_eq!(body["providers"], serde_json::json!(["gpt", "grok"]));
        assert_eq!(body["scheduler"]["cycles_completed"], 1);
        assert_eq!(body["scheduler"]["state"], "idle");
        assert_eq!(body["scheduler"]["last_cycle"]["succeeded"], 4);
    }

    #[tokio::test]
    async fn test_history_oldest_first() {
        let state = state();
        for price in [1.0, 2.0, 3.0] {
            state.cache.put(ok_record(&request("TSLA", Provider::Grok), price)).await;
        }

        let (status, body) = get(create_router(state), "/predictions/TSLA/history").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "TSLA");
        let grok = &body["providers"][1];
        assert_eq!(grok["provider"], "grok");
        let prices: Vec<f64> = grok["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["predicted_price"].as_f64().unwrap())
            .collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);
        assert!(body["providers"][0]["entries"].as_array().unwrap().is_empty());
    }
}
