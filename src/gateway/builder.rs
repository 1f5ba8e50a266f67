//! Builder for configuring gateway instances

use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

use super::conversation::Conversation;
use super::facade::Gateway;
use crate::analytics::{
    AnalyticsBatcher, AnalyticsSink, HttpAnalyticsSink, MetricsRecorder, SessionId, TracingSink,
};
use crate::cache::ResponseCache;
use crate::classify::Classifier;
use crate::clock::{Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::escalation::{EscalationNotifier, LogNotifier, WebhookNotifier};
use crate::persona::Persona;
use crate::providers::{
    AssistantProvider, ChatBackend, FallbackChain, FallbackPool, OpenAiClient, PrimaryStrategy,
    SecondaryStrategy,
};
use crate::queue::RequestQueue;
use crate::{GatewayError, Result};

/// Main entry point for creating gateway instances.
pub struct Vedetta;

impl Vedetta {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> VedettaBuilder {
        VedettaBuilder::new()
    }
}

/// Builder for configuring gateway instances.
pub struct VedettaBuilder {
    config: GatewayConfig,
    openai_key: Option<String>,
    base_url: Option<String>,
    chat_backend: Option<Arc<dyn ChatBackend>>,
    primary: Option<Arc<dyn AssistantProvider>>,
    analytics_sink: Option<Arc<dyn AnalyticsSink>>,
    notifiers: Vec<Arc<dyn EscalationNotifier>>,
    clock: Option<Arc<dyn Clock>>,
    session_id: Option<String>,
}

impl Default for VedettaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VedettaBuilder {
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
            openai_key: None,
            base_url: None,
            chat_backend: None,
            primary: None,
            analytics_sink: None,
            notifiers: Vec::new(),
            clock: None,
            session_id: None,
        }
    }

    /// Use a loaded configuration instead of the defaults.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Configure the OpenAI-compatible secondary provider.
    pub fn openai(mut self, api_key: impl Into<String>) -> Self {
        self.openai_key = Some(api_key.into());
        self
    }

    /// Base URL for the OpenAI-compatible provider (overrides config).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use a custom secondary backend instead of the OpenAI client.
    pub fn chat_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.chat_backend = Some(backend);
        self
    }

    /// Register the confidence-gated primary assistant.
    pub fn primary(mut self, assistant: Arc<dyn AssistantProvider>) -> Self {
        self.primary = Some(assistant);
        self
    }

    /// Deliver analytics batches here (overrides `analytics.endpoint`).
    pub fn analytics_sink(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics_sink = Some(sink);
        self
    }

    /// Add an escalation notifier. Without any, escalations are logged.
    pub fn notifier(mut self, notifier: Arc<dyn EscalationNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Reuse a session id instead of generating one.
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Build the gateway.
    ///
    /// Fails with [`GatewayError::NoProvider`] when there is neither a
    /// custom backend nor an API key (builder or environment).
    pub fn build(self) -> Result<Gateway> {
        let config = self.config;
        config.validate()?;

        let backend: Arc<dyn ChatBackend> = match self.chat_backend {
            Some(backend) => backend,
            None => {
                let key = self
                    .openai_key
                    .or_else(|| config.provider.api_key())
                    .ok_or(GatewayError::NoProvider)?;
                match self.base_url.or_else(|| config.provider.base_url.clone()) {
                    Some(url) => Arc::new(OpenAiClient::with_base_url(key, url)),
                    None => Arc::new(OpenAiClient::new(key)),
                }
            }
        };

        let persona = Arc::new(Persona::new(
            config.business.clone(),
            config.classifier.sectors.clone(),
        ));
        let session = Arc::new(match self.session_id {
            Some(id) => SessionId::fixed(id),
            None => SessionId::new(),
        });

        let sink: Arc<dyn AnalyticsSink> = match (self.analytics_sink, &config.analytics.endpoint) {
            (Some(sink), _) => sink,
            (None, Some(endpoint)) => Arc::new(HttpAnalyticsSink::new(endpoint.clone())),
            (None, None) => Arc::new(TracingSink),
        };
        let batcher = Arc::new(AnalyticsBatcher::new(sink, config.analytics.batch_size));
        let recorder = Arc::new(MetricsRecorder::new(
            config.analytics.metrics_capacity,
            batcher,
            session,
            config.analytics.enabled,
        ));

        let perf = &config.performance;
        let cache = perf
            .cache_enabled
            .then(|| Arc::new(ResponseCache::new(&perf.cache_config())));

        let mut chain = FallbackChain::new(
            FallbackPool::for_profile(&config.business),
            Arc::clone(&recorder),
        );
        if let Some(assistant) = self.primary {
            chain = chain.with_strategy(Arc::new(PrimaryStrategy::new(
                assistant,
                config.primary.confidence_threshold,
                perf.timeout(),
            )));
        }
        chain = chain.with_strategy(Arc::new(
            SecondaryStrategy::new(backend, perf.timeout())
                .defaults(config.provider.defaults.clone())
                .persona(Arc::clone(&persona))
                .retry(perf.retry_config()),
        ));
        if let Some(cache) = &cache {
            chain = chain.with_cache(Arc::clone(cache));
        }

        let mut notifiers = self.notifiers;
        if let Some(url) = &config.escalation.webhook_url {
            notifiers.push(Arc::new(WebhookNotifier::new(url.clone())));
        }
        if notifiers.is_empty() {
            notifiers.push(Arc::new(LogNotifier));
        }

        Ok(Gateway {
            classifier: Classifier::new(&config.classifier),
            queue: RequestQueue::new(perf.rate_limit_delay()),
            conversation: Mutex::new(Conversation::new(config.conversation.max_history)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            background: Mutex::new(None),
            deliveries: Mutex::new(JoinSet::new()),
            chain: Arc::new(chain),
            persona,
            cache,
            recorder,
            notifiers,
            config,
        })
    }
}
