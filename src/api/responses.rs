use serde::{Deserialize, Serialize};

use crate::idempotency::{IdempotencyKey, LedgerStats, MetricsSnapshot};
use crate::webhooks::WebhookOutcome;

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ErrorResponse) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<ValidationErrorDetail>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Validation error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Acknowledgement returned to providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckOutcome {
    Applied,
    Duplicate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub key: IdempotencyKey,
    pub outcome: AckOutcome,
}

impl From<WebhookOutcome> for WebhookAck {
    fn from(outcome: WebhookOutcome) -> Self {
        match outcome {
            WebhookOutcome::Applied { key } => Self {
                key,
                outcome: AckOutcome::Applied,
            },
            WebhookOutcome::Duplicate { key } => Self {
                key,
                outcome: AckOutcome::Duplicate,
            },
        }
    }
}

/// Ledger diagnostics plus processor counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyStatsResponse {
    pub ledger: LedgerStats,
    pub events: MetricsSnapshot,
    pub duplicate_rate: f64,
}

impl IdempotencyStatsResponse {
    pub fn new(ledger: LedgerStats, events: MetricsSnapshot) -> Self {
        Self {
            duplicate_rate: events.duplicate_rate(),
            ledger,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idempotency::EventSource;

    #[test]
    fn test_ack_from_outcome() {
        let key = IdempotencyKey::derive(EventSource::PaymentProvider, "ORDER-1", "paid");
        let ack = WebhookAck::from(WebhookOutcome::Duplicate { key: key.clone() });
        assert_eq!(ack.key, key);
        assert_eq!(ack.outcome, AckOutcome::Duplicate);

        let json = serde_json::to_string(&ApiResponse::success(ack)).unwrap();
        assert!(json.contains("\"outcome\":\"duplicate\""));
        assert!(json.contains("\"key\":\"payment_provider:ORDER-1:paid\""));
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse::new("VALIDATION_ERROR", "Webhook payload validation failed")
            .with_details(vec![ValidationErrorDetail {
                field: "order_id".to_string(),
                message: "order_id cannot be empty".to_string(),
            }]);
        let json = serde_json::to_string(&ApiResponse::<()>::error(error)).unwrap();
        assert!(json.contains("\"success\":false"));
        assert!(json.contains("\"field\":\"order_id\""));
    }
}
