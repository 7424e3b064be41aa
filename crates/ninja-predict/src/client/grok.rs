//! xAI Grok prediction client

use super::{CallPolicy, PredictionClient, execute};
use crate::config::PredictConfig;
use crate::error::{PredictError, Result};
use crate::parse::parse_flexible;
use crate::prompt::{SYSTEM_PROMPT, render_prediction_prompt};
use crate::record::{PredictionRecord, PredictionRequest, Provider};
use async_trait::async_trait;
use ninja_llm::providers::{XaiConfig, XaiProvider};
use ninja_llm::{CompletionRequest, LLMProvider, LiveSearch, Message};
use std::sync::Arc;
use tracing::instrument;

/// Predictions from Grok with live search over X, news and the web.
///
/// Grok sometimes answers with a single `TICKER|CURRENT|TARGET|PCT` line
/// instead of JSON, so both shapes are accepted.
pub struct GrokPredictionClient {
    llm: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    seed: u64,
    policy: CallPolicy,
}

impl GrokPredictionClient {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        temperature: f32,
        seed: u64,
        policy: CallPolicy,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature,
            seed,
            policy,
        }
    }

    /// Create a client backed by the xAI provider.
    pub fn from_config(config: &PredictConfig) -> Result<Self> {
        let provider_config = XaiConfig::new(config.xai_api_key.clone())
            .with_api_base(config.xai_api_base.clone())
            .with_timeout(config.request_timeout.as_secs().max(1));
        let llm = XaiProvider::with_config(provider_config)
            .map_err(|e| PredictError::Config(format!("xAI client: {e}")))?;

        Ok(Self::new(
            Arc::new(llm),
            config.xai_model.clone(),
            config.temperature,
            config.seed,
            CallPolicy::from_config(config),
        ))
    }

    fn completion_request(&self, request: &PredictionRequest) -> Result<CompletionRequest> {
        let prompt = render_prediction_prompt(
            &request.symbol,
            request.target_date,
            request.requested_at.date_naive(),
            true,
        )?;

        Ok(CompletionRequest::builder(&self.model)
            .system(SYSTEM_PROMPT)
            .add_message(Message::user(prompt))
            .temperature(self.temperature)
            .seed(self.seed)
            .search(LiveSearch::everywhere())
            .build())
    }
}

#[async_trait]
impl PredictionClient for GrokPredictionClient {
    fn provider(&self) -> Provider {
        Provider::Grok
    }

    #[instrument(skip(self, request), fields(symbol = %request.symbol, model = %self.model))]
    async fn predict(&self, request: PredictionRequest) -> PredictionRecord {
        let completion = self.completion_request(&request);
        execute(
            self.llm.as_ref(),
            &self.policy,
            &request,
            &self.model,
            completion,
            parse_flexible,
        )
        .await
    }
}
