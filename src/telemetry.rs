//! Telemetry metric name constants.
//!
//! Centralised metric names for vedetta operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! These complement the in-process [`PerformanceLog`](crate::analytics::PerformanceLog)
//! and the batched analytics events: the log feeds the widget, the events
//! feed the remote analytics endpoint, and these feed ops dashboards.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `vedetta_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `outcome` - sample type: "cache_hit", "api_success" or "api_error"
//! - `class` - failure class: "timeout", "rate_limit" or "general"
//! - `stage` - fallback chain stage: "primary", "secondary", "static_fallback"
//! - `priority` - escalation priority: "emergency" or "priority"

/// Total gateway requests, one per recorded performance sample.
///
/// Labels: `outcome`.
pub const REQUESTS_TOTAL: &str = "vedetta_requests_total";

/// Request duration in seconds, measured from the caller's entry point.
///
/// Labels: `outcome`.
pub const REQUEST_DURATION_SECONDS: &str = "vedetta_request_duration_seconds";

/// Total retry attempts inside the secondary stage (not counting the
/// initial request).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "vedetta_retries_total";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "vedetta_cache_hits_total";

/// Total response cache misses (including lookups on expired entries).
pub const CACHE_MISSES_TOTAL: &str = "vedetta_cache_misses_total";

/// Total replies served from the static fallback pools.
///
/// Labels: `class`.
pub const FALLBACK_REPLIES_TOTAL: &str = "vedetta_fallback_replies_total";

/// Total chain stages that fell through without failing (e.g. low
/// confidence from the primary assistant).
///
/// Labels: `stage`.
pub const FALLTHROUGHS_TOTAL: &str = "vedetta_fallthroughs_total";

/// Total escalation signals emitted.
///
/// Labels: `priority`.
pub const ESCALATIONS_TOTAL: &str = "vedetta_escalations_total";

/// Total failed analytics flushes (batch re-buffered).
pub const ANALYTICS_FLUSH_FAILURES_TOTAL: &str = "vedetta_analytics_flush_failures_total";

/// Tasks waiting in, or running on, the request queue.
pub const QUEUE_DEPTH: &str = "vedetta_queue_depth";
