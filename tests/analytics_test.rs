//! Metrics recorder, analytics batching and delivery.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vedetta::analytics::{
    AnalyticsBatcher, AnalyticsSink, HttpAnalyticsSink, MetricsRecorder, SessionId,
};
use vedetta::scheduler::BackgroundTasks;
use vedetta::types::{AnalyticsEvent, MetricKind};
use vedetta::{GatewayError, Result};

// ============================================================================
// Sinks
// ============================================================================

/// Collects delivered batches; fails the first `failures` sends.
#[derive(Default)]
struct CollectingSink {
    batches: Mutex<Vec<Vec<AnalyticsEvent>>>,
    failures: AtomicU32,
}

impl CollectingSink {
    fn failing(times: u32) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            failures: AtomicU32::new(times),
        }
    }

    fn delivered(&self) -> Vec<Vec<AnalyticsEvent>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsSink for CollectingSink {
    fn name(&self) -> &str {
        "collecting"
    }

    async fn send(&self, batch: &[AnalyticsEvent]) -> Result<()> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(GatewayError::Transport("collector unreachable".into()));
        }
        self.batches.lock().unwrap().push(batch.to_vec());
        Ok(())
    }
}

fn event(n: u32) -> AnalyticsEvent {
    AnalyticsEvent::new("test_event", json!({ "n": n }), "session_test")
}

fn recorder_with(sink: Arc<dyn AnalyticsSink>, batch_size: usize, enabled: bool) -> Arc<MetricsRecorder> {
    Arc::new(MetricsRecorder::new(
        100,
        Arc::new(AnalyticsBatcher::new(sink, batch_size)),
        Arc::new(SessionId::fixed("session_test")),
        enabled,
    ))
}

/// Wait (in paused time) until the sink has received `n` batches.
async fn wait_for_batches(sink: &CollectingSink, n: usize) {
    for _ in 0..100 {
        if sink.delivered().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("sink received {} batches, expected {n}", sink.delivered().len());
}

// ============================================================================
// Performance log
// ============================================================================

#[test]
fn performance_log_keeps_most_recent_samples() {
    let recorder = recorder_with(Arc::new(CollectingSink::default()), 1_000, false);
    for i in 0..150u64 {
        recorder.record(MetricKind::ApiSuccess, Duration::from_millis(i), None);
    }

    let samples = recorder.performance_log().snapshot();
    assert_eq!(samples.len(), 100);
    assert_eq!(samples.first().unwrap().duration_ms, 50.0);
    assert_eq!(samples.last().unwrap().duration_ms, 149.0);
}

#[test]
fn average_response_time_only_counts_successes() {
    let recorder = recorder_with(Arc::new(CollectingSink::default()), 1_000, false);
    recorder.record(MetricKind::ApiSuccess, Duration::from_millis(100), None);
    recorder.record(MetricKind::ApiSuccess, Duration::from_millis(300), None);
    recorder.record(MetricKind::CacheHit, Duration::from_millis(1), None);
    recorder.record(
        MetricKind::ApiError,
        Duration::from_millis(15_000),
        Some(&GatewayError::Timeout(Duration::from_secs(15))),
    );
    assert_eq!(recorder.average_response_time_ms(), 200.0);
}

#[test]
fn recorded_samples_become_performance_events() {
    let recorder = recorder_with(Arc::new(CollectingSink::default()), 1_000, true);
    recorder.record(
        MetricKind::ApiError,
        Duration::from_millis(20),
        Some(&GatewayError::RateLimited { retry_after: None }),
    );

    let pending = recorder.batcher().pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].event_type, "performance");
    assert_eq!(pending[0].session_id, "session_test");
    assert_eq!(pending[0].payload["type"], "api_error");
    assert_eq!(pending[0].payload["failureClass"], "rate_limit");
    assert_eq!(pending[0].payload["durationMs"], 20.0);
}

#[test]
fn disabled_analytics_tracks_nothing() {
    let recorder = recorder_with(Arc::new(CollectingSink::default()), 1_000, false);
    recorder.record(MetricKind::CacheHit, Duration::from_millis(1), None);
    recorder.track("message_analysis", json!({}));
    assert_eq!(recorder.batcher().pending_len(), 0);
    assert_eq!(recorder.performance_log().len(), 1);
}

// ============================================================================
// Batching
// ============================================================================

#[tokio::test(start_paused = true)]
async fn full_batch_flushes_before_the_timer() {
    let sink = Arc::new(CollectingSink::default());
    let recorder = recorder_with(sink.clone(), 3, true);
    let tasks = BackgroundTasks::spawn(Arc::clone(&recorder), Duration::from_secs(3600), None);
    let start = tokio::time::Instant::now();

    for n in 0..3 {
        recorder.batcher().track(event(n));
    }
    wait_for_batches(&sink, 1).await;

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(sink.delivered()[0].len(), 3);
    assert_eq!(recorder.batcher().pending_len(), 0);
    tasks.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn partial_batch_flushes_on_the_timer() {
    let sink = Arc::new(CollectingSink::default());
    let recorder = recorder_with(sink.clone(), 10, true);
    let tasks = BackgroundTasks::spawn(Arc::clone(&recorder), Duration::from_secs(30), None);

    recorder.batcher().track(event(1));
    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(sink.delivered().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    wait_for_batches(&sink, 1).await;
    assert_eq!(sink.delivered()[0].len(), 1);
    tasks.shutdown().await;
}

#[tokio::test]
async fn failed_flush_rebuffers_whole_batch_in_order() {
    let sink = Arc::new(CollectingSink::failing(1));
    let batcher = AnalyticsBatcher::new(sink.clone(), 3);
    for n in 0..3 {
        batcher.track(event(n));
    }

    assert!(batcher.flush().await.is_err());
    assert_eq!(batcher.pending_len(), 3);

    batcher.track(event(3));
    assert_eq!(batcher.flush().await.unwrap(), 4);

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    let order: Vec<u64> = delivered[0]
        .iter()
        .map(|e| e.payload["n"].as_u64().unwrap())
        .collect();
    assert_eq!(order, [0, 1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn failing_endpoint_is_retried_on_the_timer_only() {
    let sink = Arc::new(CollectingSink::failing(100));
    let attempts = || 100 - sink.failures.load(Ordering::SeqCst);
    let recorder = recorder_with(sink.clone(), 2, true);
    let tasks = BackgroundTasks::spawn(Arc::clone(&recorder), Duration::from_secs(30), None);

    recorder.batcher().track(event(0));
    recorder.batcher().track(event(1));
    for _ in 0..100 {
        if attempts() >= 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(attempts(), 1);
    assert!(recorder.batcher().backing_off());

    for n in 2..8 {
        recorder.batcher().track(event(n));
    }
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(attempts(), 1);
    assert_eq!(recorder.batcher().pending_len(), 8);

    tokio::time::sleep(Duration::from_secs(25)).await;
    for _ in 0..100 {
        if attempts() >= 2 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(attempts(), 2);
    drop(tasks);
}

#[tokio::test]
async fn successful_flush_restores_early_wakeups() {
    let sink = Arc::new(CollectingSink::failing(1));
    let batcher = AnalyticsBatcher::new(sink.clone(), 2);
    batcher.track(event(0));
    batcher.track(event(1));
    batcher.batch_ready().await;

    assert!(batcher.flush().await.is_err());
    assert!(batcher.backing_off());
    batcher.track(event(2));
    let woke = tokio::time::timeout(Duration::from_millis(10), batcher.batch_ready()).await;
    assert!(woke.is_err());

    assert_eq!(batcher.flush().await.unwrap(), 3);
    assert!(!batcher.backing_off());
    batcher.track(event(3));
    batcher.track(event(4));
    tokio::time::timeout(Duration::from_millis(10), batcher.batch_ready())
        .await
        .expect("full batch should wake the flusher");
}

#[tokio::test]
async fn shutdown_performs_final_flush() {
    let sink = Arc::new(CollectingSink::default());
    let recorder = recorder_with(sink.clone(), 10, true);
    let tasks = BackgroundTasks::spawn(Arc::clone(&recorder), Duration::from_secs(3600), None);
    assert_eq!(tasks.task_count(), 1);

    recorder.batcher().track(event(7));
    tasks.shutdown().await;

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0][0].payload["n"], 7);
}

#[tokio::test]
async fn empty_flush_does_not_call_the_sink() {
    let sink = Arc::new(CollectingSink::failing(1));
    let batcher = AnalyticsBatcher::new(sink.clone(), 3);
    assert_eq!(batcher.flush().await.unwrap(), 0);
    assert_eq!(sink.failures.load(Ordering::SeqCst), 1);
}

// ============================================================================
// HTTP sink
// ============================================================================

#[tokio::test]
async fn http_sink_posts_metrics_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/analytics"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = HttpAnalyticsSink::new(format!("{}/api/analytics", mock_server.uri()));
    sink.send(&[event(1), event(2)]).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let metrics = body["metrics"].as_array().unwrap();
    assert_eq!(metrics.len(), 2);
    assert_eq!(metrics[0]["eventType"], "test_event");
    assert_eq!(metrics[0]["sessionId"], "session_test");
    assert_eq!(metrics[0]["data"]["n"], 1);
    assert!(metrics[0]["timestamp"].is_i64());
}

#[tokio::test]
async fn http_sink_error_status_fails_the_flush() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let sink = Arc::new(HttpAnalyticsSink::new(mock_server.uri()));
    let batcher = AnalyticsBatcher::new(sink, 10);
    batcher.track(event(1));

    let err = batcher.flush().await.unwrap_err();
    assert!(matches!(err, GatewayError::Api { status: 502, .. }));
    assert_eq!(batcher.pending_len(), 1);
}

// ============================================================================
// Session id
// ============================================================================

#[test]
fn session_id_is_stable_and_prefixed() {
    let session = SessionId::new();
    let first = session.get().to_string();
    assert!(first.starts_with("session_"));
    assert_eq!(session.get(), first);
    assert_ne!(SessionId::new().get(), first);
}
