//! Performance samples and analytics events

use serde::{Deserialize, Serialize};

use crate::error::FailureClass;

/// Kind of a performance sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    CacheHit,
    ApiSuccess,
    ApiError,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::CacheHit => "cache_hit",
            MetricKind::ApiSuccess => "api_success",
            MetricKind::ApiError => "api_error",
        }
    }
}

/// One performance sample, as kept in the bounded log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub duration_ms: f64,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_class: Option<FailureClass>,
}

/// An event buffered for the remote analytics endpoint.
///
/// Delivery is at-least-once: receivers should dedupe on
/// [`dedupe_key`](Self::dedupe_key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub event_type: String,
    #[serde(rename = "data")]
    pub payload: serde_json::Value,
    pub session_id: String,
}

impl AnalyticsEvent {
    pub fn new(
        event_type: impl Into<String>,
        payload: serde_json::Value,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            event_type: event_type.into(),
            payload,
            session_id: session_id.into(),
        }
    }

    /// `(timestamp, session_id, event_type)`
    pub fn dedupe_key(&self) -> (i64, &str, &str) {
        (self.timestamp, &self.session_id, &self.event_type)
    }
}
