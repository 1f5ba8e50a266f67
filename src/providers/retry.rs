//! Retry configuration and the shared retry helper.
//!
//! Used inside the secondary stage only: retries happen within the single
//! queued task, so the queue's one-call-in-flight guarantee still holds.
//! Timeouts are not transient (see [`GatewayError::is_transient`]), so a
//! timed-out call goes straight to the static fallback.
//!
//! A retry never sleeps past the stage deadline. A provider hint longer
//! than `max_delay` ends the retries and the error is returned as is.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::warn;

use crate::telemetry;
use crate::{GatewayError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff with optional jitter:
///
/// ```rust
/// # use vedetta::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(3)
///     .initial_delay(Duration::from_millis(1000))
///     .jitter(false);
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 1s.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 10s.
    pub max_delay: Duration,
    /// Whether to add up to 25% random jitter to delays. Default: false.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    /// Set the number of retries after the initial request.
    pub fn max_retries(self, n: u32) -> Self {
        self.max_attempts(n.saturating_add(1))
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Backoff for a given attempt number (0-indexed), without jitter.
    ///
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Delay actually slept before the next attempt.
    ///
    /// A provider `retry_after` hint takes precedence over the backoff and
    /// is never jittered. Both are capped at `max_delay`.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max_delay);
        }
        let base = self.delay_for_attempt(attempt);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let spread = base.as_millis() as u64 / 4;
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }
}

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by
/// [`GatewayError::is_transient()`]) up to `config.max_attempts`. Permanent
/// errors are returned immediately. The last error is returned once the
/// attempts run out, when the provider asks to wait longer than
/// `max_delay`, or when the next attempt would start after `deadline`.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    deadline: Option<Instant>,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < config.max_attempts {
                    let delay = config.effective_delay(attempt, e.retry_after());
                    if let Some(reason) = give_up_reason(config, deadline, e.retry_after(), delay) {
                        warn!(
                            provider = provider_name,
                            attempt = attempt + 1,
                            reason,
                            error = %e,
                            "not retrying transient error"
                        );
                        return Err(e);
                    }
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "provider" => provider_name.to_owned(),
                    )
                    .increment(1);
                    warn!(
                        provider = provider_name,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or(GatewayError::NoProvider))
}

fn give_up_reason(
    config: &RetryConfig,
    deadline: Option<Instant>,
    retry_after: Option<Duration>,
    delay: Duration,
) -> Option<&'static str> {
    if retry_after.is_some_and(|hint| hint > config.max_delay) {
        return Some("retry_after exceeds max_delay");
    }
    if deadline.is_some_and(|deadline| Instant::now() + delay >= deadline) {
        return Some("deadline reached");
    }
    None
}
