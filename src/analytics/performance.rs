//! Fixed-capacity log of performance samples.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::types::{MetricKind, PerformanceMetric};

/// Ring buffer of the most recent samples; the oldest is evicted first.
#[derive(Debug)]
pub struct PerformanceLog {
    samples: Mutex<VecDeque<PerformanceMetric>>,
    capacity: usize,
}

impl PerformanceLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a sample, evicting from the front under the same lock.
    pub fn push(&self, metric: PerformanceMetric) {
        if self.capacity == 0 {
            return;
        }
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        while samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(metric);
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<PerformanceMetric> {
        self.samples
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean duration of samples of `kind`, `None` without any.
    pub fn average_duration_ms(&self, kind: MetricKind) -> Option<f64> {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        let (sum, count) = samples
            .iter()
            .filter(|m| m.kind == kind)
            .fold((0.0, 0usize), |(sum, n), m| (sum + m.duration_ms, n + 1));
        (count > 0).then(|| sum / count as f64)
    }
}
