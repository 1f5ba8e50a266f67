//! The PRIMARY → SECONDARY → STATIC_FALLBACK chain with mock stages.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use vedetta::analytics::{AnalyticsBatcher, MetricsRecorder, SessionId, TracingSink};
use vedetta::cache::{CacheConfig, ResponseCache};
use vedetta::providers::{
    AssistantProvider, ChainStage, ChatBackend, CompletionRequest, FallbackChain, FallbackPool,
    PrimaryStrategy, ProviderRequest, RetryConfig, SecondaryStrategy,
};
use vedetta::types::{
    AssistantAnswer, AssistantContext, ChatMessage, MetricKind, RequestOptions,
};
use vedetta::{FailureClass, GatewayError, Result};

const TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// Mock stages
// ============================================================================

/// Backend returning a scripted result and counting calls.
struct ScriptedBackend {
    calls: AtomicU32,
    script: Box<dyn Fn(u32) -> Result<String> + Send + Sync>,
}

impl ScriptedBackend {
    fn new(script: impl Fn(u32) -> Result<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            script: Box::new(script),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(n)
    }
}

/// Backend that never answers in time.
struct HangingBackend;

#[async_trait]
impl ChatBackend for HangingBackend {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("too late".into())
    }
}

struct Assistant {
    result: fn() -> Result<AssistantAnswer>,
}

#[async_trait]
impl AssistantProvider for Assistant {
    fn name(&self) -> &str {
        "faq"
    }

    async fn answer(&self, _message: &str, _context: &AssistantContext) -> Result<AssistantAnswer> {
        (self.result)()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn recorder() -> Arc<MetricsRecorder> {
    let batcher = Arc::new(AnalyticsBatcher::new(Arc::new(TracingSink), 100));
    Arc::new(MetricsRecorder::new(
        100,
        batcher,
        Arc::new(SessionId::fixed("session_test")),
        true,
    ))
}

fn request() -> ProviderRequest {
    ProviderRequest::new(
        vec![ChatMessage::user("Il centralino non funziona")],
        RequestOptions::new().max_tokens(150),
        AssistantContext::default(),
    )
}

fn secondary(backend: Arc<dyn ChatBackend>) -> Arc<SecondaryStrategy> {
    Arc::new(SecondaryStrategy::new(backend, TIMEOUT))
}

fn primary(result: fn() -> Result<AssistantAnswer>) -> Arc<PrimaryStrategy> {
    Arc::new(PrimaryStrategy::new(Arc::new(Assistant { result }), 0.7, TIMEOUT))
}

fn event_types(recorder: &MetricsRecorder) -> Vec<String> {
    recorder
        .batcher()
        .pending()
        .into_iter()
        .map(|e| e.event_type)
        .collect()
}

// ============================================================================
// Static fallback pools
// ============================================================================

#[tokio::test(start_paused = true)]
async fn forced_timeout_always_uses_timeout_pool() {
    let pool = FallbackPool::default();
    let chain = FallbackChain::new(pool.clone(), recorder())
        .with_strategy(secondary(Arc::new(HangingBackend)));

    for _ in 0..20 {
        let reply = chain.run(&request()).await;
        assert_eq!(reply.stage, ChainStage::StaticFallback);
        assert_eq!(reply.failure, Some(FailureClass::Timeout));
        assert!(
            pool.replies(FailureClass::Timeout).contains(&reply.text),
            "not a timeout reply: {}",
            reply.text
        );
    }
}

#[tokio::test]
async fn rate_limit_uses_rate_limit_pool() {
    let pool = FallbackPool::default();
    let backend = ScriptedBackend::new(|_| Err(GatewayError::RateLimited { retry_after: None }));
    let chain = FallbackChain::new(pool.clone(), recorder()).with_strategy(secondary(backend));

    let reply = chain.run(&request()).await;
    assert_eq!(reply.failure, Some(FailureClass::RateLimit));
    assert!(pool.replies(FailureClass::RateLimit).contains(&reply.text));
}

#[tokio::test]
async fn other_errors_use_general_pool() {
    let pool = FallbackPool::default();
    let backend = ScriptedBackend::new(|_| {
        Err(GatewayError::Api {
            status: 401,
            message: "invalid key".into(),
        })
    });
    let chain = FallbackChain::new(pool.clone(), recorder()).with_strategy(secondary(backend));

    let reply = chain.run(&request()).await;
    assert_eq!(reply.failure, Some(FailureClass::General));
    assert!(pool.replies(FailureClass::General).contains(&reply.text));
}

#[tokio::test]
async fn empty_chain_still_answers() {
    let pool = FallbackPool::default();
    let reply = FallbackChain::new(pool.clone(), recorder())
        .run(&request())
        .await;
    assert_eq!(reply.stage, ChainStage::StaticFallback);
    assert_eq!(reply.failure, None);
    assert!(pool.replies(FailureClass::General).contains(&reply.text));
}

#[tokio::test(start_paused = true)]
async fn failure_is_recorded_with_its_class() {
    let recorder = recorder();
    let chain = FallbackChain::new(FallbackPool::default(), Arc::clone(&recorder))
        .with_strategy(secondary(Arc::new(HangingBackend)));
    chain.run(&request()).await;

    let samples = recorder.performance_log().snapshot();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].kind, MetricKind::ApiError);
    assert_eq!(samples[0].failure_class, Some(FailureClass::Timeout));
    assert!(samples[0].error.as_deref().unwrap().contains("timed out"));
}

// ============================================================================
// Secondary success
// ============================================================================

#[tokio::test]
async fn secondary_success_is_cached_and_recorded() {
    let recorder = recorder();
    let cache = Arc::new(ResponseCache::new(&CacheConfig::default()));
    let backend = ScriptedBackend::new(|_| Ok("Riavvia il centralino.".into()));
    let chain = FallbackChain::new(FallbackPool::default(), Arc::clone(&recorder))
        .with_strategy(secondary(backend.clone()))
        .with_cache(Arc::clone(&cache));

    let request = request();
    let reply = chain.run(&request).await;

    assert_eq!(reply.text, "Riavvia il centralino.");
    assert_eq!(reply.stage, ChainStage::Secondary);
    assert_eq!(reply.provider, "scripted");
    assert!(!reply.cached);
    assert_eq!(cache.get(request.key).as_deref(), Some("Riavvia il centralino."));
    assert_eq!(backend.calls(), 1);

    let samples = recorder.performance_log().snapshot();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].kind, MetricKind::ApiSuccess);
}

#[tokio::test(start_paused = true)]
async fn transient_errors_are_retried_inside_secondary() {
    let backend = ScriptedBackend::new(|n| match n {
        0 | 1 => Err(GatewayError::RateLimited {
            retry_after: Some(Duration::from_secs(1)),
        }),
        _ => Ok("terzo tentativo".into()),
    });
    let strategy = SecondaryStrategy::new(backend.clone(), TIMEOUT).retry(RetryConfig::new().max_retries(2));
    let chain = FallbackChain::new(FallbackPool::default(), recorder()).with_strategy(Arc::new(strategy));

    let reply = chain.run(&request()).await;
    assert_eq!(reply.text, "terzo tentativo");
    assert_eq!(backend.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn long_retry_after_hint_serves_rate_limit_pool() {
    let backend = ScriptedBackend::new(|n| match n {
        0 => Err(GatewayError::RateLimited {
            retry_after: Some(Duration::from_secs(3600)),
        }),
        _ => Ok("dopo un'ora".into()),
    });
    let strategy = SecondaryStrategy::new(backend.clone(), TIMEOUT).retry(RetryConfig::new().max_retries(2));
    let pool = FallbackPool::default();
    let chain = FallbackChain::new(pool.clone(), recorder()).with_strategy(Arc::new(strategy));

    let start = tokio::time::Instant::now();
    let reply = chain.run(&request()).await;

    assert!(start.elapsed() < TIMEOUT, "held for {:?}", start.elapsed());
    assert_eq!(reply.stage, ChainStage::StaticFallback);
    assert_eq!(reply.failure, Some(FailureClass::RateLimit));
    assert!(pool.replies(FailureClass::RateLimit).contains(&reply.text));
    assert_eq!(backend.calls(), 1);
}

/// First call fails slowly, every later call hangs.
struct SlowThenHangingBackend {
    calls: AtomicU32,
}

#[async_trait]
impl ChatBackend for SlowThenHangingBackend {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_secs(10)).await;
            return Err(GatewayError::Transport("connection reset".into()));
        }
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("too late".into())
    }
}

#[tokio::test(start_paused = true)]
async fn retries_share_one_stage_timeout() {
    let backend = Arc::new(SlowThenHangingBackend {
        calls: AtomicU32::new(0),
    });
    let strategy = SecondaryStrategy::new(backend.clone(), TIMEOUT).retry(RetryConfig::new().max_retries(2));
    let chain = FallbackChain::new(FallbackPool::default(), recorder()).with_strategy(Arc::new(strategy));

    let start = tokio::time::Instant::now();
    let reply = chain.run(&request()).await;

    let elapsed = start.elapsed();
    assert!(elapsed >= TIMEOUT && elapsed < TIMEOUT + Duration::from_secs(1), "{elapsed:?}");
    assert_eq!(reply.stage, ChainStage::StaticFallback);
    assert_eq!(reply.failure, Some(FailureClass::Timeout));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let backend = ScriptedBackend::new(|_| {
        Err(GatewayError::Api {
            status: 400,
            message: "bad request".into(),
        })
    });
    let strategy = SecondaryStrategy::new(backend.clone(), TIMEOUT).retry(RetryConfig::new().max_retries(2));
    let chain = FallbackChain::new(FallbackPool::default(), recorder()).with_strategy(Arc::new(strategy));

    let reply = chain.run(&request()).await;
    assert_eq!(reply.stage, ChainStage::StaticFallback);
    assert_eq!(backend.calls(), 1);
}

// ============================================================================
// Primary stage
// ============================================================================

#[tokio::test]
async fn confident_primary_answer_skips_secondary() {
    let recorder = recorder();
    let backend = ScriptedBackend::new(|_| Ok("secondary".into()));
    let chain = FallbackChain::new(FallbackPool::default(), Arc::clone(&recorder))
        .with_strategy(primary(|| {
            Ok(AssistantAnswer {
                response: "Il centralino si riavvia dal pannello.".into(),
                confidence: 0.9,
            })
        }))
        .with_strategy(secondary(backend.clone()));

    let reply = chain.run(&request()).await;
    assert_eq!(reply.stage, ChainStage::Primary);
    assert_eq!(reply.provider, "faq");
    assert_eq!(backend.calls(), 0);
    assert!(event_types(&recorder).contains(&"primary_success".to_string()));
}

#[tokio::test]
async fn low_confidence_falls_through_without_error() {
    let recorder = recorder();
    let backend = ScriptedBackend::new(|_| Ok("secondary".into()));
    let chain = FallbackChain::new(FallbackPool::default(), Arc::clone(&recorder))
        .with_strategy(primary(|| {
            Ok(AssistantAnswer {
                response: "forse".into(),
                confidence: 0.7,
            })
        }))
        .with_strategy(secondary(backend.clone()));

    let reply = chain.run(&request()).await;
    assert_eq!(reply.stage, ChainStage::Secondary);
    assert_eq!(reply.text, "secondary");
    assert_eq!(reply.failure, None);
    assert_eq!(backend.calls(), 1);

    let samples = recorder.performance_log().snapshot();
    assert!(samples.iter().all(|s| s.kind != MetricKind::ApiError));
    assert!(event_types(&recorder).contains(&"provider_fallthrough".to_string()));
}

#[tokio::test]
async fn primary_error_is_a_failure_then_secondary_answers() {
    let recorder = recorder();
    let backend = ScriptedBackend::new(|_| Ok("secondary".into()));
    let chain = FallbackChain::new(FallbackPool::default(), Arc::clone(&recorder))
        .with_strategy(primary(|| Err(GatewayError::Transport("faq offline".into()))))
        .with_strategy(secondary(backend));

    let reply = chain.run(&request()).await;
    assert_eq!(reply.stage, ChainStage::Secondary);
    assert_eq!(reply.failure, Some(FailureClass::General));

    let kinds: Vec<MetricKind> = recorder
        .performance_log()
        .snapshot()
        .into_iter()
        .map(|s| s.kind)
        .collect();
    assert_eq!(kinds, [MetricKind::ApiError, MetricKind::ApiSuccess]);
}
