//! Serial request queue.
//!
//! [`RequestQueue`] runs queued operations one at a time, in enqueue order,
//! on a single worker task. Each operation is awaited to completion before
//! the next is taken, so at most one provider call is ever in flight.
//! When more work is waiting after a task finishes, the worker pauses for
//! the configured pacing delay first.
//!
//! The worker is spawned by the first [`enqueue`](RequestQueue::enqueue)
//! and then idles on the channel until more work arrives.
//!
//! A failing (or panicking) operation only fails its own caller. Nothing
//! is retried here; retry belongs to the fallback chain.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::telemetry;
use crate::{GatewayError, Result};

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

pub struct RequestQueue {
    tx: mpsc::UnboundedSender<Job>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
    closed: AtomicBool,
    delay: Duration,
}

impl RequestQueue {
    /// Create an idle queue that waits `delay` between consecutive tasks.
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            worker: Mutex::new(None),
            pending: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Tasks waiting or running.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue `operation` and wait for its result.
    ///
    /// Resolves in enqueue order relative to other callers. Fails with
    /// [`GatewayError::QueueClosed`] after [`shutdown`](Self::shutdown) and
    /// with [`GatewayError::TaskPanicked`] if the operation panics.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context (called within an async fn).
    pub async fn enqueue<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GatewayError::QueueClosed);
        }

        let (done_tx, done_rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let outcome = match AssertUnwindSafe(async move { operation().await })
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("queued task panicked");
                        Err(GatewayError::TaskPanicked)
                    }
                };
                // caller may have gone away
                let _ = done_tx.send(outcome);
            })
        });

        self.ensure_worker();
        let depth = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::gauge!(telemetry::QUEUE_DEPTH).set(depth as f64);

        if self.tx.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(GatewayError::QueueClosed);
        }
        done_rx.await.map_err(|_| GatewayError::QueueClosed)?
    }

    /// Stop the worker. Tasks still queued are dropped and their callers
    /// get [`GatewayError::QueueClosed`].
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
        }
        // never started: drop the receiver so nothing can be queued
        self.rx.lock().unwrap_or_else(|e| e.into_inner()).take();
        self.pending.store(0, Ordering::SeqCst);
        metrics::gauge!(telemetry::QUEUE_DEPTH).set(0.0);
    }

    fn ensure_worker(&self) {
        let rx = self.rx.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(rx) = rx else {
            return;
        };
        debug!(delay_ms = self.delay.as_millis() as u64, "starting request queue worker");
        let handle = tokio::spawn(run_worker(rx, Arc::clone(&self.pending), self.delay));
        *self.worker.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }
}

impl Drop for RequestQueue {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.get_mut().ok().and_then(|w| w.take()) {
            handle.abort();
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    pending: Arc<AtomicUsize>,
    delay: Duration,
) {
    while let Some(job) = rx.recv().await {
        job().await;

        let remaining = pending.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::gauge!(telemetry::QUEUE_DEPTH).set(remaining as f64);

        if remaining > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
