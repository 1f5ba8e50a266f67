//! Metrics recorder and analytics delivery.
//!
//! [`MetricsRecorder`] is the single place the gateway reports to:
//!
//! - every sample goes into the bounded [`PerformanceLog`], which backs
//!   the average response time shown in the conversation context;
//! - every sample also emits `metrics` counters and histograms (see
//!   [`telemetry`](crate::telemetry));
//! - when analytics is enabled, samples and conversation events are
//!   buffered in the [`AnalyticsBatcher`] for remote delivery.

mod batcher;
mod performance;
mod session;
mod sink;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

pub use batcher::AnalyticsBatcher;
pub use performance::PerformanceLog;
pub use session::SessionId;
pub use sink::{AnalyticsSink, HttpAnalyticsSink, TracingSink};

use crate::telemetry;
use crate::types::{AnalyticsEvent, MetricKind, PerformanceMetric};
use crate::{GatewayError, Result};

pub struct MetricsRecorder {
    log: PerformanceLog,
    batcher: Arc<AnalyticsBatcher>,
    session: Arc<SessionId>,
    analytics_enabled: bool,
}

impl MetricsRecorder {
    pub fn new(
        capacity: usize,
        batcher: Arc<AnalyticsBatcher>,
        session: Arc<SessionId>,
        analytics_enabled: bool,
    ) -> Self {
        Self {
            log: PerformanceLog::new(capacity),
            batcher,
            session,
            analytics_enabled,
        }
    }

    /// Record one performance sample and forward it as a `performance` event.
    pub fn record(
        &self,
        kind: MetricKind,
        duration: Duration,
        error: Option<&GatewayError>,
    ) -> PerformanceMetric {
        let metric = PerformanceMetric {
            kind,
            duration_ms: duration.as_micros() as f64 / 1000.0,
            timestamp: chrono::Utc::now().timestamp_millis(),
            error: error.map(|e| e.to_string()),
            failure_class: error.map(|e| e.failure_class()),
        };

        match error {
            Some(e) => metrics::counter!(telemetry::REQUESTS_TOTAL,
                "outcome" => kind.as_str(),
                "class" => e.failure_class().as_str(),
            )
            .increment(1),
            None => metrics::counter!(telemetry::REQUESTS_TOTAL, "outcome" => kind.as_str())
                .increment(1),
        }
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "outcome" => kind.as_str())
            .record(duration.as_secs_f64());

        self.log.push(metric.clone());
        if self.analytics_enabled {
            match serde_json::to_value(&metric) {
                Ok(payload) => self.track("performance", payload),
                Err(e) => tracing::warn!(error = %e, "failed to encode performance sample"),
            }
        }
        metric
    }

    /// Buffer an analytics event for this session. No-op when disabled.
    pub fn track(&self, event_type: &str, payload: Value) {
        if !self.analytics_enabled {
            return;
        }
        self.batcher
            .track(AnalyticsEvent::new(event_type, payload, self.session.get()));
    }

    pub async fn flush(&self) -> Result<usize> {
        self.batcher.flush().await
    }

    pub fn analytics_enabled(&self) -> bool {
        self.analytics_enabled
    }

    pub fn batcher(&self) -> &Arc<AnalyticsBatcher> {
        &self.batcher
    }

    pub fn session_id(&self) -> &str {
        self.session.get()
    }

    pub fn performance_log(&self) -> &PerformanceLog {
        &self.log
    }

    /// Mean latency of successful provider calls, zero when there are none.
    pub fn average_response_time_ms(&self) -> f64 {
        self.log
            .average_duration_ms(MetricKind::ApiSuccess)
            .unwrap_or(0.0)
    }
}
