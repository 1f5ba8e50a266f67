//! Batched delivery of analytics events.
//!
//! Events accumulate in memory until either the batch size is reached or
//! the flush timer fires, whichever comes first. Reaching the batch size
//! wakes the scheduler through [`AnalyticsBatcher::batch_ready`]; it does
//! not wait for the next tick.
//!
//! A failed flush puts the whole batch back at the front of the buffer.
//! Delivery is therefore at-least-once: receivers should dedupe on
//! timestamp, session id and event type. Until a flush succeeds again, a
//! full buffer no longer wakes the scheduler early; the timer paces the
//! retries.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::{debug, warn};

use super::sink::AnalyticsSink;
use crate::telemetry;
use crate::types::AnalyticsEvent;
use crate::Result;

pub struct AnalyticsBatcher {
    pending: Mutex<VecDeque<AnalyticsEvent>>,
    batch_size: usize,
    sink: Arc<dyn AnalyticsSink>,
    ready: Notify,
    last_flush_failed: AtomicBool,
    // one flush at a time, so a re-buffered batch lands before newer drains
    flushing: tokio::sync::Mutex<()>,
}

impl AnalyticsBatcher {
    pub fn new(sink: Arc<dyn AnalyticsSink>, batch_size: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            batch_size: batch_size.max(1),
            sink,
            ready: Notify::new(),
            last_flush_failed: AtomicBool::new(false),
            flushing: tokio::sync::Mutex::new(()),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Buffer an event, signalling when a full batch is waiting and the
    /// previous flush went through.
    pub fn track(&self, event: AnalyticsEvent) {
        let len = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.push_back(event);
            pending.len()
        };
        if len >= self.batch_size && !self.last_flush_failed.load(Ordering::Acquire) {
            self.ready.notify_one();
        }
    }

    /// Whether the most recent flush attempt failed.
    pub fn backing_off(&self) -> bool {
        self.last_flush_failed.load(Ordering::Acquire)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Copy of the buffered events, oldest first.
    pub fn pending(&self) -> Vec<AnalyticsEvent> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Resolves once a full batch has been buffered.
    ///
    /// A signal raised while nobody was waiting is kept, so the next call
    /// returns immediately.
    pub async fn batch_ready(&self) {
        self.ready.notified().await;
    }

    /// Send everything buffered. Returns the number of events delivered.
    ///
    /// On failure the batch is restored ahead of anything tracked since.
    pub async fn flush(&self) -> Result<usize> {
        let _guard = self.flushing.lock().await;

        let batch: Vec<AnalyticsEvent> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain(..).collect()
        };
        if batch.is_empty() {
            return Ok(0);
        }

        match self.sink.send(&batch).await {
            Ok(()) => {
                self.last_flush_failed.store(false, Ordering::Release);
                debug!(sink = self.sink.name(), events = batch.len(), "flushed analytics");
                Ok(batch.len())
            }
            Err(e) => {
                self.last_flush_failed.store(true, Ordering::Release);
                metrics::counter!(telemetry::ANALYTICS_FLUSH_FAILURES_TOTAL).increment(1);
                warn!(
                    sink = self.sink.name(),
                    events = batch.len(),
                    error = %e,
                    "analytics flush failed, re-buffering batch"
                );
                let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
                for event in batch.into_iter().rev() {
                    pending.push_front(event);
                }
                Err(e)
            }
        }
    }
}
