//! Vedetta - AI gateway for a customer-support chat widget
//!
//! A [`Gateway`] turns one inbound widget message into a reply. It
//! classifies the text (urgency, sector, sentiment, service, intent),
//! raises escalation signals for urgent conversations, answers repeated
//! requests from a TTL cache and sends everything else through a
//! one-at-a-time request queue into a provider fallback chain
//! (optional primary assistant, OpenAI-compatible completion, canned
//! replies). Performance samples and analytics events are recorded along
//! the way and flushed in batches.
//!
//! The gateway always answers: upstream failures only degrade the reply
//! to a canned one.
//!
//! # Example
//!
//! ```rust,no_run
//! use vedetta::{GatewayConfig, RequestOptions, Vedetta};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> vedetta::Result<()> {
//!     let gateway = Vedetta::builder()
//!         .config(GatewayConfig::load_or_default(None)?)
//!         .openai("sk-your-key")
//!         .build()?;
//!     gateway.start();
//!
//!     let reply = gateway
//!         .send_message("Il server è bloccato, emergenza!", RequestOptions::default())
//!         .await;
//!     println!("{}", reply.response);
//!
//!     gateway.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod cache;
pub mod classify;
pub mod clock;
pub mod config;
pub mod error;
pub mod escalation;
pub mod gateway;
pub mod persona;
pub mod providers;
pub mod queue;
pub mod scheduler;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheKey, ResponseCache};
pub use classify::{Classifier, ClassifierConfig};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::GatewayConfig;
pub use error::{FailureClass, GatewayError, Result};
pub use escalation::{
    ChannelNotifier, EscalationNotifier, EscalationSignal, LogNotifier, WebhookNotifier,
};
pub use gateway::{Gateway, Vedetta, VedettaBuilder};
pub use persona::{BusinessProfile, Persona};
pub use providers::{
    AssistantProvider, ChainReply, ChainStage, ChatBackend, FallbackChain, FallbackPool,
    OpenAiClient, RetryConfig,
};
pub use queue::RequestQueue;

pub use types::{
    AnalyticsEvent, AssistantAnswer, AssistantContext, ChatMessage, ConversationContext,
    EscalationPriority, GatewayReply, Intent, MessageAnalysis, MetricKind, PerformanceMetric,
    RequestOptions, Role, Sector, Sentiment, Service, UrgencyLevel,
};
