//! SECONDARY stage: the standard chat-completion provider.
//!
//! The whole stage, retries included, is bounded by one timeout. When it
//! elapses the in-flight request future is dropped, which aborts the HTTP
//! call; a late response can no longer reach the caller. Transient errors
//! are retried with backoff inside this stage while time remains.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::retry::{with_retry, RetryConfig};
use super::traits::{
    ChainStage, ChatBackend, CompletionRequest, Outcome, ProviderRequest, ResponseStrategy,
};
use crate::persona::Persona;
use crate::types::{ChatMessage, Role, Sector};
use crate::GatewayError;

/// Request parameters used when the caller leaves them unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionDefaults {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for CompletionDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-4".into(),
            max_tokens: 300,
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

pub struct SecondaryStrategy {
    backend: Arc<dyn ChatBackend>,
    defaults: CompletionDefaults,
    persona: Option<Arc<Persona>>,
    timeout: Duration,
    retry: RetryConfig,
}

impl SecondaryStrategy {
    pub fn new(backend: Arc<dyn ChatBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            defaults: CompletionDefaults::default(),
            persona: None,
            timeout,
            retry: RetryConfig::disabled(),
        }
    }

    pub fn defaults(mut self, defaults: CompletionDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Prepend the persona's system prompt when the caller sent none.
    pub fn persona(mut self, persona: Arc<Persona>) -> Self {
        self.persona = Some(persona);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Wire body for `request`, with defaults and system prompt applied.
    pub fn completion_request(&self, request: &ProviderRequest) -> CompletionRequest {
        let options = &request.options;
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(persona) = &self.persona {
            let has_system = request
                .messages
                .first()
                .is_some_and(|m| m.role == Role::System);
            if !has_system {
                let sector = options.sector.unwrap_or(Sector::General);
                messages.push(ChatMessage::system(persona.system_prompt(sector)));
            }
        }
        messages.extend(request.messages.iter().cloned());

        CompletionRequest {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| self.defaults.model.clone()),
            messages,
            max_tokens: options.max_tokens.unwrap_or(self.defaults.max_tokens),
            temperature: options.temperature.unwrap_or(self.defaults.temperature),
            top_p: self.defaults.top_p,
            frequency_penalty: self.defaults.frequency_penalty,
            presence_penalty: self.defaults.presence_penalty,
        }
    }
}

#[async_trait]
impl ResponseStrategy for SecondaryStrategy {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn stage(&self) -> ChainStage {
        ChainStage::Secondary
    }

    async fn attempt(&self, request: &ProviderRequest) -> Outcome {
        let body = self.completion_request(request);
        let deadline = Instant::now() + self.timeout;
        let result = with_retry(&self.retry, self.backend.name(), Some(deadline), || async {
            match tokio::time::timeout_at(deadline, self.backend.complete(&body)).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout(self.timeout)),
            }
        })
        .await;

        match result {
            Ok(text) => Outcome::Success(text),
            Err(e) => Outcome::Failure(e),
        }
    }
}
