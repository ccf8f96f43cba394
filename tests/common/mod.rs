#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use grounds_webhooks::error::{AppError, Result};
use grounds_webhooks::idempotency::{IdempotencyLedger, ManualClock};
use grounds_webhooks::orders::OrderStore;
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

mock! {
    pub OrderStore {}

    #[async_trait]
    impl OrderStore for OrderStore {
        async fn apply_transition(&self, external_order_id: &str, new_status: &str) -> Result<()>;
        async fn ping(&self) -> Result<()>;
    }
}

pub fn test_start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Ledger with the default 24h window on a clock the test controls.
pub fn manual_ledger() -> (Arc<IdempotencyLedger>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(test_start()));
    let ledger = IdempotencyLedger::with_clock(IdempotencyLedger::default_retention(), clock.clone())
        .expect("valid retention");
    (Arc::new(ledger), clock)
}

/// Order store that records every call and can be told to fail or stall.
#[derive(Default)]
pub struct RecordingOrderStore {
    calls: Mutex<Vec<(String, String)>>,
    failures_remaining: AtomicUsize,
    delay: Option<std::time::Duration>,
}

impl RecordingOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(times: usize) -> Self {
        Self {
            failures_remaining: AtomicUsize::new(times),
            ..Self::default()
        }
    }

    pub fn slow(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderStore for RecordingOrderStore {
    async fn apply_transition(&self, external_order_id: &str, new_status: &str) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.calls
            .lock()
            .unwrap()
            .push((external_order_id.to_string(), new_status.to_string()));

        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::OrderStore("simulated write failure".to_string()));
        }
        Ok(())
    }
}

pub fn hours(n: i64) -> Duration {
    Duration::hours(n)
}
