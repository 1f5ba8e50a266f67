//! Background work owned by a gateway instance.
//!
//! Two loops, both stopped by [`BackgroundTasks::shutdown`]:
//!
//! - the analytics flusher wakes on its interval or as soon as a full batch
//!   is buffered;
//! - the cache sweeper removes expired entries on the cleanup interval.
//!
//! Shutdown performs one last analytics flush after the loops have stopped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::analytics::MetricsRecorder;
use crate::cache::ResponseCache;

pub struct BackgroundTasks {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
    recorder: Arc<MetricsRecorder>,
}

impl BackgroundTasks {
    /// Spawn the loops.
    ///
    /// The flusher only runs when analytics is enabled, the sweeper only
    /// when a cache is given.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn spawn(
        recorder: Arc<MetricsRecorder>,
        flush_interval: Duration,
        cache: Option<(Arc<ResponseCache>, Duration)>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();

        if recorder.analytics_enabled() && !flush_interval.is_zero() {
            handles.push(tokio::spawn(run_flusher(
                Arc::clone(&recorder),
                flush_interval,
                shutdown_rx.clone(),
            )));
        }
        if let Some((cache, every)) = cache
            && !every.is_zero()
        {
            handles.push(tokio::spawn(run_sweeper(cache, every, shutdown_rx)));
        }

        Self {
            shutdown_tx,
            handles,
            recorder,
        }
    }

    pub fn task_count(&self) -> usize {
        self.handles.len()
    }

    /// Stop both loops and flush what is left.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        for handle in std::mem::take(&mut self.handles) {
            if let Err(e) = handle.await
                && e.is_panic()
            {
                warn!(error = %e, "background task panicked");
            }
        }
        if self.recorder.analytics_enabled()
            && let Err(e) = self.recorder.flush().await
        {
            warn!(error = %e, "final analytics flush failed");
        }
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

async fn run_flusher(
    recorder: Arc<MetricsRecorder>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately
    ticker.tick().await;

    let batcher = Arc::clone(recorder.batcher());
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
            _ = batcher.batch_ready() => {
                debug!("batch size reached, flushing early");
                ticker.reset();
            }
        }
        // failures are logged and re-buffered by the batcher
        let _ = recorder.flush().await;
    }
}

async fn run_sweeper(
    cache: Arc<ResponseCache>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let removed = cache.sweep(Instant::now());
                if removed > 0 {
                    debug!(removed, "swept expired cache entries");
                }
            }
        }
    }
}
