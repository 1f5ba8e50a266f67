//! The provider fallback chain.
//!
//! Walks PRIMARY → SECONDARY → STATIC_FALLBACK and stops at the first
//! success. Stages with no registered strategy are skipped. The static
//! fallback always produces text, so [`FallbackChain::run`] never fails.
//!
//! Side effects per outcome:
//!
//! - secondary success: the reply is cached under the request fingerprint
//!   and an `api_success` sample is recorded;
//! - primary success: an `api_success` sample and a `primary_success` event;
//! - fallthrough: a `provider_fallthrough` event, nothing counted as error;
//! - failure: an `api_error` sample tagged with the failure class.
//!
//! When the static fallback is reached, the last recorded failure picks
//! the reply pool.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::fallback::FallbackPool;
use super::traits::{ChainStage, Outcome, ProviderRequest, ResponseStrategy};
use crate::analytics::MetricsRecorder;
use crate::cache::ResponseCache;
use crate::error::FailureClass;
use crate::telemetry;
use crate::types::MetricKind;

/// Text produced by the chain and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainReply {
    pub text: String,
    pub stage: ChainStage,
    pub provider: String,
    /// Class of the last failure seen, if any stage failed.
    pub failure: Option<FailureClass>,
    /// Served from the response cache without running the chain.
    pub cached: bool,
}

impl ChainReply {
    /// A secondary reply found in the cache.
    pub fn from_cache(text: String) -> Self {
        Self {
            text,
            stage: ChainStage::Secondary,
            provider: "cache".into(),
            failure: None,
            cached: true,
        }
    }
}

pub struct FallbackChain {
    strategies: Vec<Arc<dyn ResponseStrategy>>,
    fallback: FallbackPool,
    cache: Option<Arc<ResponseCache>>,
    recorder: Arc<MetricsRecorder>,
}

impl FallbackChain {
    pub fn new(fallback: FallbackPool, recorder: Arc<MetricsRecorder>) -> Self {
        Self {
            strategies: Vec::new(),
            fallback,
            cache: None,
            recorder,
        }
    }

    /// Register a strategy. Strategies of the same stage run in
    /// registration order.
    pub fn with_strategy(mut self, strategy: Arc<dyn ResponseStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Cache secondary replies here.
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn strategies(&self) -> impl Iterator<Item = &Arc<dyn ResponseStrategy>> {
        self.strategies.iter()
    }

    pub fn fallback(&self) -> &FallbackPool {
        &self.fallback
    }

    /// Run the chain to completion.
    #[instrument(skip(self, request), fields(key = request.key.as_u64()))]
    pub async fn run(&self, request: &ProviderRequest) -> ChainReply {
        let start = Instant::now();
        let mut stage = ChainStage::Primary;
        let mut last_failure: Option<FailureClass> = None;

        loop {
            if stage == ChainStage::StaticFallback {
                let class = last_failure.unwrap_or(FailureClass::General);
                debug!(class = class.as_str(), "serving static fallback");
                return ChainReply {
                    text: self.fallback.pick(class),
                    stage,
                    provider: "static".into(),
                    failure: last_failure,
                    cached: false,
                };
            }

            for strategy in self.strategies.iter().filter(|s| s.stage() == stage) {
                match strategy.attempt(request).await {
                    Outcome::Success(text) => {
                        self.on_success(stage, strategy.name(), request, &text, start);
                        return ChainReply {
                            text,
                            stage,
                            provider: strategy.name().to_string(),
                            failure: last_failure,
                            cached: false,
                        };
                    }
                    Outcome::Fallthrough(reason) => {
                        metrics::counter!(telemetry::FALLTHROUGHS_TOTAL, "stage" => stage.as_str())
                            .increment(1);
                        debug!(stage = stage.as_str(), provider = strategy.name(), reason = %reason, "stage fell through");
                        self.recorder.track(
                            "provider_fallthrough",
                            json!({
                                "stage": stage.as_str(),
                                "provider": strategy.name(),
                                "reason": reason.kind(),
                            }),
                        );
                    }
                    Outcome::Failure(error) => {
                        warn!(stage = stage.as_str(), provider = strategy.name(), error = %error, "provider stage failed");
                        self.recorder
                            .record(MetricKind::ApiError, start.elapsed(), Some(&error));
                        last_failure = Some(error.failure_class());
                    }
                }
            }
            stage = stage.next();
        }
    }

    fn on_success(
        &self,
        stage: ChainStage,
        provider: &str,
        request: &ProviderRequest,
        text: &str,
        start: Instant,
    ) {
        self.recorder
            .record(MetricKind::ApiSuccess, start.elapsed(), None);
        match stage {
            ChainStage::Secondary => {
                if let Some(cache) = &self.cache {
                    cache.put(request.key, text);
                }
            }
            ChainStage::Primary => {
                self.recorder.track(
                    "primary_success",
                    json!({ "provider": provider, "responseLength": text.chars().count() }),
                );
            }
            ChainStage::StaticFallback => {}
        }
    }
}
