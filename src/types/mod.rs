//! Public types for the Vedetta API.

mod analytics;
mod classification;
mod message;
mod options;
mod response;

pub use analytics::{AnalyticsEvent, MetricKind, PerformanceMetric};
pub use classification::{
    EscalationPriority, Intent, MessageAnalysis, ScoreVector, Sector, SectorResult, Sentiment,
    SentimentResult, Service, ServiceRecommendation, UrgencyLevel, UrgencyResult,
};
pub use message::{ChatMessage, Role};
pub use options::RequestOptions;
pub use response::{AssistantAnswer, AssistantContext, ConversationContext, GatewayReply};
