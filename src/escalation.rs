//! Human-handoff signals.
//!
//! The gateway raises an [`EscalationSignal`] when a message is urgent by
//! score or by sentiment. Notifiers deliver it somewhere a human will see
//! it. Delivery failures are logged and otherwise ignored: the user's
//! reply never waits on, or fails because of, a notifier.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::types::{EscalationPriority, MessageAnalysis};
use crate::{GatewayError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationSignal {
    pub session_id: String,
    pub message: String,
    pub priority: EscalationPriority,
    pub analysis: MessageAnalysis,
    pub raised_at: NaiveDateTime,
}

impl EscalationSignal {
    /// Build a signal if `analysis` calls for one.
    pub fn from_analysis(
        session_id: &str,
        message: &str,
        analysis: &MessageAnalysis,
    ) -> Option<Self> {
        let priority = analysis.escalation_priority()?;
        Some(Self {
            session_id: session_id.to_string(),
            message: message.to_string(),
            priority,
            analysis: analysis.clone(),
            raised_at: analysis.analyzed_at,
        })
    }
}

#[async_trait]
pub trait EscalationNotifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, signal: &EscalationSignal) -> Result<()>;
}

/// Logs escalations at `info`/`warn`. The default notifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl EscalationNotifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, signal: &EscalationSignal) -> Result<()> {
        match signal.priority {
            EscalationPriority::Emergency => warn!(
                session_id = %signal.session_id,
                score = signal.analysis.urgency.adjusted_score,
                sector = signal.analysis.sector.sector.as_str(),
                "emergency escalation"
            ),
            EscalationPriority::Priority => info!(
                session_id = %signal.session_id,
                score = signal.analysis.urgency.adjusted_score,
                sector = signal.analysis.sector.sector.as_str(),
                "priority escalation"
            ),
        }
        Ok(())
    }
}

/// POSTs the signal as JSON to a webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl EscalationNotifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, signal: &EscalationSignal) -> Result<()> {
        let response = self.http.post(&self.url).json(signal).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Forwards signals to an in-process receiver, e.g. an operator UI.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<EscalationSignal>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EscalationSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EscalationNotifier for ChannelNotifier {
    fn name(&self) -> &str {
        "channel"
    }

    async fn notify(&self, signal: &EscalationSignal) -> Result<()> {
        self.tx
            .send(signal.clone())
            .map_err(|_| GatewayError::Transport("escalation receiver dropped".into()))
    }
}
