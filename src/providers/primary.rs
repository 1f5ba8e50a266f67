//! PRIMARY stage: an optional assistant gated on its own confidence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::traits::{AssistantProvider, ChainStage, Outcome, ProviderRequest, ResponseStrategy};
use crate::GatewayError;

pub struct PrimaryStrategy {
    assistant: Arc<dyn AssistantProvider>,
    threshold: f64,
    timeout: Duration,
}

impl PrimaryStrategy {
    /// Accept answers whose confidence is strictly above `threshold`.
    pub fn new(assistant: Arc<dyn AssistantProvider>, threshold: f64, timeout: Duration) -> Self {
        Self {
            assistant,
            threshold,
            timeout,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[async_trait]
impl ResponseStrategy for PrimaryStrategy {
    fn name(&self) -> &str {
        self.assistant.name()
    }

    fn stage(&self) -> ChainStage {
        ChainStage::Primary
    }

    async fn attempt(&self, request: &ProviderRequest) -> Outcome {
        let call = self.assistant.answer(request.last_message(), &request.context);
        let answer = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => return Outcome::Failure(e),
            Err(_) => return Outcome::Failure(GatewayError::Timeout(self.timeout)),
        };

        if answer.confidence > self.threshold && !answer.response.trim().is_empty() {
            Outcome::Success(answer.response)
        } else {
            debug!(
                assistant = self.assistant.name(),
                confidence = answer.confidence,
                threshold = self.threshold,
                "primary answer below threshold"
            );
            Outcome::Fallthrough(GatewayError::LowConfidence {
                confidence: answer.confidence,
                threshold: self.threshold,
            })
        }
    }
}
