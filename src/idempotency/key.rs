//! Idempotency keys for provider callbacks.
//!
//! A key identifies one logical webhook event, not one delivery. Its format is
//! `<source>:<external_order_id>:<status>`, for example
//! `payment_provider:ORDER-1:paid`.
//!
//! Field values are escaped (`%` as `%25`, `:` as `%3A`) before joining, so a
//! value containing the separator can never collide with a different triple.
//! Ordinary identifiers contain neither character and appear verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the three key fields.
pub const KEY_SEPARATOR: char = ':';

/// External system a callback was received from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    PaymentProvider,
    ShippingProvider,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::PaymentProvider => "payment_provider",
            EventSource::ShippingProvider => "shipping_provider",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic identifier of a logical provider event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derives the key for `(source, external_order_id, status)`.
    ///
    /// Never fails. Empty or odd inputs still yield a key; rejecting malformed
    /// events is the caller's job.
    pub fn derive(source: EventSource, external_order_id: &str, status: &str) -> Self {
        let mut key = String::with_capacity(
            source.as_str().len() + external_order_id.len() + status.len() + 2,
        );
        key.push_str(source.as_str());
        key.push(KEY_SEPARATOR);
        push_escaped(&mut key, external_order_id);
        key.push(KEY_SEPARATOR);
        push_escaped(&mut key, status);
        IdempotencyKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            KEY_SEPARATOR => out.push_str("%3A"),
            other => out.push(other),
        }
    }
}
