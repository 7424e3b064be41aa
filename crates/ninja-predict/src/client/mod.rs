//! Provider clients
//!
//! A [`PredictionClient`] turns one [`PredictionRequest`] into one
//! [`PredictionRecord`]. Clients never fail: transport errors, timeouts,
//! authentication problems and unreadable answers all come back as
//! `status = error` records so the scheduler can cache them like any other
//! result. There are no retries here; the next refresh cycle is the retry.

mod gpt;
mod grok;

pub use gpt::GptPredictionClient;
pub use grok::GrokPredictionClient;

use crate::config::PredictConfig;
use crate::error::{PredictError, Result};
use crate::parse::{ParsedPrediction, log_drift};
use crate::record::{PredictionRecord, PredictionRequest, Provider};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use ninja_llm::{CompletionRequest, CompletionResponse, LLMProvider, StopReason};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// One external prediction source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PredictionClient: Send + Sync {
    /// Which provider this client talks to
    fn provider(&self) -> Provider;

    /// Request a prediction. Always yields a record, possibly an error record.
    async fn predict(&self, request: PredictionRequest) -> PredictionRecord;
}

/// Per-call limits shared by both clients
#[derive(Clone)]
pub struct CallPolicy {
    timeout: Duration,
    rate_limiter: Option<SharedRateLimiter>,
}

impl CallPolicy {
    /// `requests_per_minute = 0` disables rate limiting.
    pub fn new(timeout: Duration, requests_per_minute: u32) -> Self {
        let rate_limiter = NonZeroU32::new(requests_per_minute)
            .map(|rpm| Arc::new(RateLimiter::direct(Quota::per_minute(rpm))));
        Self {
            timeout,
            rate_limiter,
        }
    }

    pub fn from_config(config: &PredictConfig) -> Self {
        Self::new(config.request_timeout, config.requests_per_minute)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for the limiter, then run the completion.
    ///
    /// The timeout and the reported elapsed time both include any wait for
    /// the rate limiter.
    async fn complete(
        &self,
        llm: &dyn LLMProvider,
        request: CompletionRequest,
    ) -> (Result<CompletionResponse>, Duration) {
        let started = Instant::now();
        let call = async {
            if let Some(limiter) = &self.rate_limiter {
                limiter.until_ready().await;
                let waited = started.elapsed();
                if waited >= Duration::from_millis(1) {
                    debug!(waited_ms = waited.as_millis(), "Throttled by provider rate limit");
                }
            }
            llm.complete(request).await
        };

        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(PredictError::from(e)),
            Err(_) => Err(PredictError::Timeout(self.timeout)),
        };
        (outcome, started.elapsed())
    }
}

/// Run one provider call end to end and normalize the outcome.
pub(crate) async fn execute(
    llm: &dyn LLMProvider,
    policy: &CallPolicy,
    request: &PredictionRequest,
    model: &str,
    completion: Result<CompletionRequest>,
    parse: fn(&str, &PredictionRequest) -> Result<ParsedPrediction>,
) -> PredictionRecord {
    let completion = match completion {
        Ok(c) => c,
        Err(e) => return PredictionRecord::failed(request, model, &e, None, Duration::ZERO),
    };

    let (outcome, elapsed) = policy.complete(llm, completion).await;
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            warn!(
                symbol = %request.symbol,
                provider = %request.provider,
                error = %e,
                elapsed_ms = elapsed.as_millis(),
                "Provider call failed"
            );
            return PredictionRecord::failed(request, model, &e, None, elapsed);
        }
    };

    if response.stop_reason != StopReason::EndTurn {
        debug!(
            symbol = %request.symbol,
            provider = %request.provider,
            stop_reason = ?response.stop_reason,
            "Provider stopped early"
        );
    }

    match parse(&response.text, request) {
        Ok(mut parsed) => {
            if response.stop_reason != StopReason::EndTurn {
                parsed
                    .warnings
                    .push(format!("provider stop reason {:?}", response.stop_reason));
            }
            log_drift(&parsed, request);
            PredictionRecord::from_parsed(request, model, parsed, response.text, elapsed)
        }
        Err(e) => {
            warn!(
                symbol = %request.symbol,
                provider = %request.provider,
                error = %e,
                "Unreadable provider answer"
            );
            PredictionRecord::failed(request, model, &e, Some(response.text), elapsed)
        }
    }
}

/// Build both production clients from configuration.
pub fn build_clients(config: &PredictConfig) -> Result<Vec<Arc<dyn PredictionClient>>> {
    build_clients_for(config, &Provider::ALL)
}

/// Build clients for `providers` only, in [`Provider::ALL`] order.
pub fn build_clients_for(
    config: &PredictConfig,
    providers: &[Provider],
) -> Result<Vec<Arc<dyn PredictionClient>>> {
    let mut clients: Vec<Arc<dyn PredictionClient>> = Vec::with_capacity(providers.len());
    for provider in Provider::ALL {
        if !providers.contains(&provider) {
            continue;
        }
        match provider {
            Provider::Gpt => clients.push(Arc::new(GptPredictionClient::from_config(config)?)),
            Provider::Grok => clients.push(Arc::new(GrokPredictionClient::from_config(config)?)),
        }
    }
    Ok(clients)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted stand-in for a real LLM provider

    use super::*;
    use ninja_llm::{LLMError, TokenUsage};
    use std::sync::Mutex;

    pub(crate) enum Script {
        Reply(String),
        Delayed(Duration, String),
        Fail(fn() -> LLMError),
    }

    pub(crate) struct ScriptedProvider {
        script: Script,
        pub(crate) seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                seen: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn reply(text: &str) -> Arc<Self> {
            Self::new(Script::Reply(text.to_string()))
        }

        pub(crate) fn last_request(&self) -> CompletionRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    fn response(text: &str) -> CompletionResponse {
        CompletionResponse {
            text: text.to_string(),
            model: None,
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> ninja_llm::Result<CompletionResponse> {
            self.seen.lock().unwrap().push(request);
            match &self.script {
                Script::Reply(text) => Ok(response(text)),
                Script::Delayed(delay, text) => {
                    tokio::time::sleep(*delay).await;
                    Ok(response(text))
                }
                Script::Fail(make) => Err(make()),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
