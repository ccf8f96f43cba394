use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for webhook deduplication outcomes.
#[derive(Debug, Default)]
pub struct IdempotencyMetrics {
    pub total_events: AtomicU64,
    pub applied_events: AtomicU64,
    pub duplicate_events: AtomicU64,
    pub failed_events: AtomicU64,
}

impl IdempotencyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&self) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_applied(&self) {
        self.applied_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicate_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_events: self.total_events.load(Ordering::Relaxed),
            applied_events: self.applied_events.load(Ordering::Relaxed),
            duplicate_events: self.duplicate_events.load(Ordering::Relaxed),
            failed_events: self.failed_events.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_events: u64,
    pub applied_events: u64,
    pub duplicate_events: u64,
    pub failed_events: u64,
}

impl MetricsSnapshot {
    pub fn duplicate_rate(&self) -> f64 {
        if self.total_events == 0 {
            0.0
        } else {
            self.duplicate_events as f64 / self.total_events as f64
        }
    }
}
