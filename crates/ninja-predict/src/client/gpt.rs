//! OpenAI GPT prediction client

use super::{CallPolicy, PredictionClient, execute};
use crate::config::PredictConfig;
use crate::error::{PredictError, Result};
use crate::parse::parse_json_prediction;
use crate::prompt::{SYSTEM_PROMPT, render_prediction_prompt};
use crate::record::{PredictionRecord, PredictionRequest, Provider};
use async_trait::async_trait;
use ninja_llm::providers::{OpenAIConfig, OpenAIProvider};
use ninja_llm::{CompletionRequest, LLMProvider, LiveSearch, Message};
use std::sync::Arc;
use tracing::instrument;

/// Reasoning effort requested from GPT reasoning models
const REASONING_EFFORT: &str = "medium";

/// Predictions from GPT through the Responses API.
///
/// The model gets the web search tool and a medium reasoning budget. Sampling
/// temperature is not sent because GPT-5 rejects it. Answers must be a JSON
/// object.
pub struct GptPredictionClient {
    llm: Arc<dyn LLMProvider>,
    model: String,
    policy: CallPolicy,
}

impl GptPredictionClient {
    pub fn new(llm: Arc<dyn LLMProvider>, model: impl Into<String>, policy: CallPolicy) -> Self {
        Self {
            llm,
            model: model.into(),
            policy,
        }
    }

    /// Create a client backed by the OpenAI provider.
    pub fn from_config(config: &PredictConfig) -> Result<Self> {
        let provider_config = OpenAIConfig::new(config.openai_api_key.clone())
            .with_api_base(config.openai_api_base.clone())
            .with_timeout(config.request_timeout.as_secs().max(1));
        let llm = OpenAIProvider::with_config(provider_config)
            .map_err(|e| PredictError::Config(format!("OpenAI client: {e}")))?;

        Ok(Self::new(
            Arc::new(llm),
            config.openai_model.clone(),
            CallPolicy::from_config(config),
        ))
    }

    fn completion_request(&self, request: &PredictionRequest) -> Result<CompletionRequest> {
        let prompt = render_prediction_prompt(
            &request.symbol,
            request.target_date,
            request.requested_at.date_naive(),
            false,
        )?;

        Ok(CompletionRequest::builder(&self.model)
            .system(SYSTEM_PROMPT)
            .add_message(Message::user(prompt))
            .reasoning_effort(REASONING_EFFORT)
            .search(LiveSearch::default())
            .build())
    }
}

#[async_trait]
impl PredictionClient for GptPredictionClient {
    fn provider(&self) -> Provider {
        Provider::Gpt
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
            parse_json_prediction,
        )
        .await
    }
}
