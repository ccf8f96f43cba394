use serde::{Deserialize, Serialize};

use crate::idempotency::{EventSource, IdempotencyKey};

/// A validated provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub source: EventSource,
    pub external_order_id: String,
    pub status: String,
    /// Provider-side reference (payment transaction id, tracking number).
    /// Logged only; not part of the idempotency key.
    pub reference: Option<String>,
}

impl WebhookEvent {
    pub fn new(
        source: EventSource,
        external_order_id: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            source,
            external_order_id: external_order_id.into(),
            status: status.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey::derive(self.source, &self.external_order_id, &self.status)
    }
}

/// What the processor did with an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Transition applied to the order store.
    Applied { key: IdempotencyKey },
    /// Key already held or processed; order store untouched.
    Duplicate { key: IdempotencyKey },
}

impl WebhookOutcome {
    pub fn key(&self) -> &IdempotencyKey {
        match self {
            WebhookOutcome::Applied { key } | WebhookOutcome::Duplicate { key } => key,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, WebhookOutcome::Duplicate { .. })
    }
}
