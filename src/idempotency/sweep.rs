use std::sync::Arc;
use std::time::Duration;

use crate::idempotency::ledger::IdempotencyLedger;
use crate::observability::get_metrics;

/// Background job that evicts expired ledger entries.
///
/// Lazy eviction on read is enough for correctness; the sweep only bounds
/// memory for keys that are never looked up again.
pub struct IdempotencySweepJob {
    ledger: Arc<IdempotencyLedger>,
    interval: Duration,
}

impl IdempotencySweepJob {
    pub fn new(ledger: Arc<IdempotencyLedger>, interval: Duration) -> Self {
        Self { ledger, interval }
    }

    /// Runs the sweep once.
    pub fn run_once(&self) -> usize {
        let evicted = self.ledger.sweep_expired();
        get_metrics().set_ledger_entries(self.ledger.len() as i64);
        evicted
    }

    /// Starts the sweep in a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let evicted = self.run_once();
                if evicted > 0 {
                    tracing::info!(
                        evicted,
                        remaining = self.ledger.len(),
                        "Swept expired idempotency entries"
                    );
                }
            }
        })
    }
}
