//! Destinations for analytics batches.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::types::AnalyticsEvent;
use crate::{GatewayError, Result};

/// Receives whole batches of analytics events.
///
/// An `Err` makes the batcher keep the batch for the next flush, so a
/// sink may see the same events more than once.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, batch: &[AnalyticsEvent]) -> Result<()>;
}

#[derive(Serialize)]
struct BatchBody<'a> {
    metrics: &'a [AnalyticsEvent],
}

/// POSTs `{"metrics": [...]}` to an HTTP endpoint.
#[derive(Clone)]
pub struct HttpAnalyticsSink {
    http: Client,
    endpoint: String,
}

impl HttpAnalyticsSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalyticsSink for HttpAnalyticsSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, batch: &[AnalyticsEvent]) -> Result<()> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&BatchBody { metrics: batch })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        debug!(endpoint = %self.endpoint, events = batch.len(), "analytics batch delivered");
        Ok(())
    }
}

/// Writes batches to the tracing log. Used when no endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl AnalyticsSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn send(&self, batch: &[AnalyticsEvent]) -> Result<()> {
        for event in batch {
            debug!(
                event_type = %event.event_type,
                session_id = %event.session_id,
                timestamp = event.timestamp,
                data = %event.payload,
                "analytics event"
            );
        }
        Ok(())
    }
}
