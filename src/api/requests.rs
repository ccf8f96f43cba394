use serde::{Deserialize, Serialize};

use crate::idempotency::EventSource;
use crate::webhooks::WebhookEvent;

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn validate_common(order_id: &Option<String>, status: &Option<String>) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if is_blank(order_id) {
        errors.push(ValidationError::new("order_id", "order_id cannot be empty"));
    }
    if is_blank(status) {
        errors.push(ValidationError::new("status", "status cannot be empty"));
    }
    errors
}

fn build_event(
    source: EventSource,
    order_id: Option<String>,
    status: Option<String>,
    reference: Option<String>,
) -> WebhookEvent {
    let mut event = WebhookEvent::new(
        source,
        order_id.unwrap_or_default().trim(),
        status.unwrap_or_default().trim().to_lowercase(),
    );
    if let Some(reference) = reference.filter(|r| !r.trim().is_empty()) {
        event = event.with_reference(reference.trim());
    }
    event
}

/// Payment provider callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhookPayload {
    #[serde(default, alias = "external_order_id", alias = "orderId")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "transactionId")]
    pub transaction_id: Option<String>,
}

impl PaymentWebhookPayload {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let errors = validate_common(&self.order_id, &self.status);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Converts a validated payload. Status is trimmed and lower-cased so
    /// casing differences between deliveries dedupe together.
    pub fn into_event(self) -> WebhookEvent {
        build_event(
            EventSource::PaymentProvider,
            self.order_id,
            self.status,
            self.transaction_id,
        )
    }
}

/// Shipping provider callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingWebhookPayload {
    #[serde(default, alias = "external_order_id", alias = "orderId")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "trackingNumber")]
    pub tracking_number: Option<String>,
}

impl ShippingWebhookPayload {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let errors = validate_common(&self.order_id, &self.status);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn into_event(self) -> WebhookEvent {
        build_event(
            EventSource::ShippingProvider,
            self.order_id,
            self.status,
            self.tracking_number,
        )
    }
}
