use std::sync::Arc;

use crate::error::Result;
use crate::idempotency::{IdempotencyLedger, IdempotencyMetrics};
use crate::observability::{get_metrics, mask_sensitive, LatencyTimer};
use crate::orders::OrderStore;
use crate::webhooks::event::{WebhookEvent, WebhookOutcome};

/// Applies provider callbacks to the order store at most once per event.
///
/// For each event the processor claims the event's idempotency key, applies
/// the transition, and then either commits the key (success) or releases it
/// (failure) so the provider's redelivery can try again. A delivery that finds
/// the key already held is acknowledged without touching the order store.
pub struct WebhookProcessor {
    ledger: Arc<IdempotencyLedger>,
    order_store: Arc<dyn OrderStore>,
    metrics: Arc<IdempotencyMetrics>,
}

impl WebhookProcessor {
    pub fn new(ledger: Arc<IdempotencyLedger>, order_store: Arc<dyn OrderStore>) -> Self {
        Self {
            ledger,
            order_store,
            metrics: Arc::new(IdempotencyMetrics::new()),
        }
    }

    pub fn ledger(&self) -> Arc<IdempotencyLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn order_store(&self) -> Arc<dyn OrderStore> {
        Arc::clone(&self.order_store)
    }

    pub fn metrics(&self) -> Arc<IdempotencyMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn process(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        let key = event.idempotency_key();
        let source = event.source.as_str();
        self.metrics.record_event();
        get_metrics().record_webhook_received(source);

        let Some(claim) = self.ledger.claim(&key) else {
            self.metrics.record_duplicate();
            get_metrics().record_webhook_duplicate(source);
            tracing::info!(key = %key, "Duplicate webhook event, skipping");
            return Ok(WebhookOutcome::Duplicate { key });
        };

        if let Some(reference) = &event.reference {
            tracing::debug!(key = %key, reference = %mask_sensitive(reference, 4), "Applying webhook event");
        }

        let timer = LatencyTimer::new();
        let applied = self
            .order_store
            .apply_transition(&event.external_order_id, &event.status)
            .await;
        get_metrics().record_transition_latency(source, timer.elapsed_ms());

        match applied {
            Ok(()) => {
                claim.commit();
                self.metrics.record_applied();
                get_metrics().record_webhook_applied(source);
                get_metrics().set_ledger_entries(self.ledger.len() as i64);
                tracing::info!(key = %key, "Webhook event applied");
                Ok(WebhookOutcome::Applied { key })
            }
            Err(e) => {
                claim.release();
                self.metrics.record_failed();
                get_metrics().record_webhook_failed(source);
                tracing::warn!(key = %key, error = %e, "Order transition failed, key released for retry");
                Err(e)
            }
        }
    }
}
