//! Upstream providers and the fallback chain.
//!
//! - [`traits`] - stage/strategy traits and the provider seams.
//! - [`primary`] - optional confidence-gated assistant.
//! - [`secondary`] - timeout-bounded chat-completion stage with retry.
//! - [`openai`] - OpenAI-compatible [`ChatBackend`].
//! - [`fallback`] - canned replies per failure class.
//! - [`chain`] - the state machine tying the stages together.

pub mod chain;
pub mod fallback;
pub mod openai;
pub mod primary;
pub mod retry;
pub mod secondary;
pub mod traits;

pub use chain::{ChainReply, FallbackChain};
pub use fallback::FallbackPool;
pub use openai::OpenAiClient;
pub use primary::PrimaryStrategy;
pub use retry::RetryConfig;
pub use secondary::{CompletionDefaults, SecondaryStrategy};
pub use traits::{
    AssistantProvider, ChainStage, ChatBackend, CompletionRequest, Outcome, ProviderRequest,
    ResponseStrategy,
};
