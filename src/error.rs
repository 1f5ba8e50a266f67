//! Vedetta error types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Vedetta error types
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    // Provider/network errors
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The primary assistant answered, but not confidently enough.
    ///
    /// This is a fallthrough signal for the chain, not a failure.
    #[error("confidence {confidence:.2} below threshold {threshold:.2}")]
    LowConfidence { confidence: f64, threshold: f64 },

    #[error("empty response from provider")]
    EmptyResponse,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("no provider configured")]
    NoProvider,

    #[error("configuration error: {0}")]
    Configuration(String),

    // Runtime errors
    #[error("request queue closed")]
    QueueClosed,

    #[error("queued task panicked")]
    TaskPanicked,
}

/// Failure class used to pick a static fallback reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Timeout,
    RateLimit,
    General,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Timeout => "timeout",
            FailureClass::RateLimit => "rate_limit",
            FailureClass::General => "general",
        }
    }
}

impl GatewayError {
    /// Whether a retry of the same request might succeed.
    ///
    /// Timeouts are excluded: the timeout budget is already spent and the
    /// request still holds the only provider slot.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::RateLimited { .. } | GatewayError::Transport(_) => true,
            GatewayError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Map this error onto a static fallback pool.
    pub fn failure_class(&self) -> FailureClass {
        match self {
            GatewayError::Timeout(_) => FailureClass::Timeout,
            GatewayError::RateLimited { .. } => FailureClass::RateLimit,
            GatewayError::Api { status: 429, .. } => FailureClass::RateLimit,
            _ => FailureClass::General,
        }
    }

    /// Stable tag for metrics and analytics payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Timeout(_) => "timeout",
            GatewayError::RateLimited { .. } => "rate_limit",
            GatewayError::Transport(_) => "transport",
            GatewayError::Api { .. } => "api",
            GatewayError::LowConfidence { .. } => "low_confidence",
            GatewayError::EmptyResponse => "empty_response",
            GatewayError::Json(_) => "json",
            GatewayError::NoProvider => "no_provider",
            GatewayError::Configuration(_) => "configuration",
            GatewayError::QueueClosed => "queue_closed",
            GatewayError::TaskPanicked => "task_panicked",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest doesn't say which budget elapsed; the strategy-level
            // timeout normally fires first and carries the real value.
            GatewayError::Timeout(Duration::ZERO)
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Result type alias for Vedetta operations
pub type Result<T> = std::result::Result<T, GatewayError>;
