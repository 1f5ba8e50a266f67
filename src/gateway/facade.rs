//! The gateway facade: one instance per widget session.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Timelike;
use serde_json::json;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::conversation::Conversation;
use crate::analytics::MetricsRecorder;
use crate::cache::{CacheKey, ResponseCache};
use crate::classify::Classifier;
use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::escalation::{EscalationNotifier, EscalationSignal};
use crate::persona::Persona;
use crate::providers::{ChainReply, ChainStage, FallbackChain, ProviderRequest};
use crate::queue::RequestQueue;
use crate::scheduler::BackgroundTasks;
use crate::telemetry;
use crate::types::{
    AssistantContext, ChatMessage, ConversationContext, EscalationPriority, GatewayReply,
    MessageAnalysis, MetricKind, PerformanceMetric, RequestOptions,
};

/// Gateway composing cache, classifier, queue, fallback chain and metrics.
///
/// Built with [`Vedetta::builder`](super::Vedetta::builder). Call
/// [`start`](Self::start) to run the background flusher and cache sweeper
/// and [`shutdown`](Self::shutdown) to stop them.
pub struct Gateway {
    pub(super) config: GatewayConfig,
    pub(super) classifier: Classifier,
    pub(super) persona: Arc<Persona>,
    pub(super) cache: Option<Arc<ResponseCache>>,
    pub(super) queue: RequestQueue,
    pub(super) chain: Arc<FallbackChain>,
    pub(super) recorder: Arc<MetricsRecorder>,
    pub(super) notifiers: Vec<Arc<dyn EscalationNotifier>>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) conversation: Mutex<Conversation>,
    pub(super) background: Mutex<Option<BackgroundTasks>>,
    pub(super) deliveries: Mutex<JoinSet<()>>,
}

impl Gateway {
    /// Spawn the background tasks. Idempotent.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn start(&self) {
        let mut background = lock(&self.background);
        if background.is_some() {
            return;
        }
        let sweep = self
            .cache
            .as_ref()
            .map(|cache| (Arc::clone(cache), self.config.performance.cleanup_interval()));
        let tasks = BackgroundTasks::spawn(
            Arc::clone(&self.recorder),
            self.config.analytics.flush_interval(),
            sweep,
        );
        debug!(tasks = tasks.task_count(), "background tasks started");
        *background = Some(tasks);
    }

    /// Stop background work, flush pending analytics, wait for escalation
    /// deliveries (bounded by `escalation.shutdown_timeout_ms`) and close
    /// the queue.
    pub async fn shutdown(&self) {
        self.drain_deliveries().await;
        let tasks = lock(&self.background).take();
        match tasks {
            Some(tasks) => tasks.shutdown().await,
            None => {
                if self.recorder.analytics_enabled()
                    && let Err(e) = self.recorder.flush().await
                {
                    warn!(error = %e, "final analytics flush failed");
                }
            }
        }
        self.queue.shutdown();
        info!(session_id = self.session_id(), "gateway shut down");
    }

    async fn drain_deliveries(&self) {
        let mut deliveries = std::mem::take(&mut *lock(&self.deliveries));
        if deliveries.is_empty() {
            return;
        }
        let pending = deliveries.len();
        let drained = tokio::time::timeout(self.config.escalation.shutdown_timeout(), async {
            while deliveries.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                pending,
                unfinished = deliveries.len(),
                "escalation deliveries still running at shutdown, aborting"
            );
            deliveries.abort_all();
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.background).is_some()
    }

    /// Classify `text` at the current wall-clock time.
    pub fn analyze(&self, text: &str) -> MessageAnalysis {
        self.classifier.analyze(text, self.clock.now())
    }

    /// Produce a reply for `messages`.
    ///
    /// Cache hits return without touching the queue. Misses run the
    /// fallback chain as one queued task. Never fails: every error ends in
    /// a canned reply.
    #[instrument(skip_all, fields(messages = messages.len()))]
    pub async fn complete(&self, messages: &[ChatMessage], options: &RequestOptions) -> ChainReply {
        self.complete_with(messages, options, self.assistant_context(options))
            .await
    }

    async fn complete_with(
        &self,
        messages: &[ChatMessage],
        options: &RequestOptions,
        context: AssistantContext,
    ) -> ChainReply {
        let start = Instant::now();
        let key = CacheKey::fingerprint(messages, options);
        if let Some(cache) = &self.cache
            && let Some(text) = cache.get(key)
        {
            self.recorder
                .record(MetricKind::CacheHit, start.elapsed(), None);
            return ChainReply::from_cache(text);
        }

        let request = ProviderRequest::new(messages.to_vec(), options.clone(), context);
        let chain = Arc::clone(&self.chain);
        match self
            .queue
            .enqueue(move || async move { Ok(chain.run(&request).await) })
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "queued request did not complete");
                self.recorder
                    .record(MetricKind::ApiError, start.elapsed(), Some(&e));
                let class = e.failure_class();
                ChainReply {
                    text: self.chain.fallback().pick(class),
                    stage: ChainStage::StaticFallback,
                    provider: "static".into(),
                    failure: Some(class),
                    cached: false,
                }
            }
        }
    }

    /// Handle one message from the widget.
    ///
    /// Classifies the text, raises an escalation when needed, asks the
    /// provider chain with the shaped prompt and recent history, and
    /// post-processes the reply for the detected urgency and sector.
    #[instrument(skip_all, fields(session_id = self.session_id()))]
    pub async fn send_message(&self, text: &str, options: RequestOptions) -> GatewayReply {
        let analysis = self.analyze(text);
        self.recorder.track(
            "message_analysis",
            json!({
                "urgency": analysis.urgency.level.as_str(),
                "urgencyScore": analysis.urgency.adjusted_score,
                "sector": analysis.sector.sector.as_str(),
                "sentiment": analysis.sentiment.sentiment.as_str(),
                "service": analysis.service.service.as_str(),
                "intent": analysis.intent.as_str(),
                "messageLength": analysis.message_length,
            }),
        );
        self.escalate(text, &analysis);

        let (mut messages, user_sentiment, message_count) = {
            let conversation = lock(&self.conversation);
            (
                conversation.recent(self.config.conversation.history_window),
                conversation.last_sentiment(),
                conversation.message_count(),
            )
        };
        messages.push(ChatMessage::user(
            self.persona.enhanced_user_message(text, &analysis),
        ));

        let options = options.or(self.persona.options_for(&analysis));
        let context = AssistantContext {
            sector: Some(analysis.sector.sector),
            urgency: Some(analysis.urgency.level),
            conversation: ConversationContext {
                session_id: self.session_id().to_string(),
                message_count,
                average_response_time_ms: self.recorder.average_response_time_ms(),
                user_sentiment,
            },
        };

        let reply = self.complete_with(&messages, &options, context).await;
        let response = self.persona.enhance_response(&reply.text, &analysis);

        {
            let mut conversation = lock(&self.conversation);
            conversation.push_user(text, analysis.sentiment.sentiment);
            conversation.push_assistant(&response);
        }

        self.recorder.track(
            "ai_response_generated",
            json!({
                "stage": reply.stage.as_str(),
                "provider": reply.provider,
                "cached": reply.cached,
                "failureClass": reply.failure.map(|c| c.as_str()),
                "responseLength": response.chars().count(),
                "urgency": analysis.urgency.level.as_str(),
                "sector": analysis.sector.sector.as_str(),
            }),
        );

        GatewayReply {
            response,
            classification: Some(analysis),
        }
    }

    fn escalate(&self, text: &str, analysis: &MessageAnalysis) {
        if !self.config.escalation.enabled {
            return;
        }
        let Some(signal) = EscalationSignal::from_analysis(self.session_id(), text, analysis)
        else {
            return;
        };

        metrics::counter!(telemetry::ESCALATIONS_TOTAL, "priority" => signal.priority.as_str())
            .increment(1);
        let event = match signal.priority {
            EscalationPriority::Emergency => "emergency_triggered",
            EscalationPriority::Priority => "priority_handling",
        };
        self.recorder.track(
            event,
            json!({
                "urgencyScore": analysis.urgency.adjusted_score,
                "sector": analysis.sector.sector.as_str(),
                "sentiment": analysis.sentiment.sentiment.as_str(),
            }),
        );

        let signal = Arc::new(signal);
        let mut deliveries = lock(&self.deliveries);
        while deliveries.try_join_next().is_some() {}
        for notifier in &self.notifiers {
            let notifier = Arc::clone(notifier);
            let signal = Arc::clone(&signal);
            deliveries.spawn(async move {
                if let Err(e) = notifier.notify(&signal).await {
                    warn!(notifier = notifier.name(), error = %e, "escalation notifier failed");
                }
            });
        }
    }

    fn assistant_context(&self, options: &RequestOptions) -> AssistantContext {
        let conversation = lock(&self.conversation);
        AssistantContext {
            sector: options.sector,
            urgency: options.urgency_hint,
            conversation: ConversationContext {
                session_id: self.session_id().to_string(),
                message_count: conversation.message_count(),
                average_response_time_ms: self.recorder.average_response_time_ms(),
                user_sentiment: conversation.last_sentiment(),
            },
        }
    }

    /// Greeting for the current time of day.
    pub fn welcome_message(&self) -> String {
        self.persona.welcome_message(self.clock.now().hour())
    }

    pub fn conversation_context(&self) -> ConversationContext {
        self.assistant_context(&RequestOptions::default())
            .conversation
    }

    /// Forget the conversation history. Session and metrics are kept.
    pub fn reset_conversation(&self) {
        lock(&self.conversation).clear();
    }

    pub fn performance_samples(&self) -> Vec<PerformanceMetric> {
        self.recorder.performance_log().snapshot()
    }

    pub fn session_id(&self) -> &str {
        self.recorder.session_id()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    pub fn recorder(&self) -> &Arc<MetricsRecorder> {
        &self.recorder
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
