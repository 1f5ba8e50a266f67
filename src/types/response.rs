//! Gateway and provider response types

use serde::{Deserialize, Serialize};

use super::classification::{MessageAnalysis, Sector, Sentiment, UrgencyLevel};

/// What the widget gets back for one inbound message.
///
/// `response` is always present; upstream failures only degrade it to a
/// canned reply.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayReply {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<MessageAnalysis>,
}

/// Answer from the primary assistant, with its self-reported confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantAnswer {
    pub response: String,
    /// 0.0..=1.0
    pub confidence: f64,
}

/// Conversation summary handed to the primary assistant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub session_id: String,
    pub message_count: usize,
    /// Mean latency of successful provider calls, zero when none.
    pub average_response_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_sentiment: Option<Sentiment>,
}

/// Request context for the primary assistant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<UrgencyLevel>,
    pub conversation: ConversationContext,
}
