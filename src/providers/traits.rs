//! Provider and strategy traits.
//!
//! The fallback chain is a list of [`ResponseStrategy`] values, each bound
//! to a [`ChainStage`]. A strategy reports one of three outcomes:
//!
//! - `Success`: the chain stops and returns the text;
//! - `Fallthrough`: not an error (e.g. a low-confidence answer); the chain
//!   moves on without recording a failure;
//! - `Failure`: recorded as an error metric, then the chain moves on.
//!
//! Strategies wrap the two kinds of upstream service:
//! [`AssistantProvider`] (answers with a self-reported confidence) and
//! [`ChatBackend`] (an OpenAI-style chat-completion endpoint).

use async_trait::async_trait;
use serde::Serialize;

use crate::cache::CacheKey;
use crate::types::{AssistantAnswer, AssistantContext, ChatMessage, RequestOptions};
use crate::{GatewayError, Result};

/// Ordered states of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStage {
    Primary,
    Secondary,
    StaticFallback,
}

impl ChainStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainStage::Primary => "primary",
            ChainStage::Secondary => "secondary",
            ChainStage::StaticFallback => "static_fallback",
        }
    }

    /// The stage tried after this one. `StaticFallback` is terminal.
    pub fn next(self) -> ChainStage {
        match self {
            ChainStage::Primary => ChainStage::Secondary,
            ChainStage::Secondary | ChainStage::StaticFallback => ChainStage::StaticFallback,
        }
    }
}

/// One provider call as seen by every stage.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub messages: Vec<ChatMessage>,
    pub options: RequestOptions,
    /// Fingerprint of `messages` and `options` as the caller passed them.
    pub key: CacheKey,
    pub context: AssistantContext,
}

impl ProviderRequest {
    pub fn new(messages: Vec<ChatMessage>, options: RequestOptions, context: AssistantContext) -> Self {
        let key = CacheKey::fingerprint(&messages, &options);
        Self {
            messages,
            options,
            key,
            context,
        }
    }

    /// Content of the last message, empty when there are none.
    pub fn last_message(&self) -> &str {
        self.messages.last().map(|m| m.content.as_str()).unwrap_or("")
    }
}

#[derive(Debug)]
pub enum Outcome {
    Success(String),
    Fallthrough(GatewayError),
    Failure(GatewayError),
}

/// A stage of the fallback chain.
#[async_trait]
pub trait ResponseStrategy: Send + Sync {
    /// Strategy name for logging/metrics.
    fn name(&self) -> &str;

    fn stage(&self) -> ChainStage;

    /// Try to produce a reply. Must not panic on upstream errors; report
    /// them as `Failure`.
    async fn attempt(&self, request: &ProviderRequest) -> Outcome;
}

/// An assistant that scores its own answers.
#[async_trait]
pub trait AssistantProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn answer(&self, message: &str, context: &AssistantContext) -> Result<AssistantAnswer>;
}

/// Body of an OpenAI-compatible chat-completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

/// A chat-completion endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Return the assistant text of the first choice.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
