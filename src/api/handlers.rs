use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::api::requests::{PaymentWebhookPayload, ShippingWebhookPayload, ValidationError};
use crate::api::responses::{
    ApiResponse, ErrorResponse, IdempotencyStatsResponse, ValidationErrorDetail, WebhookAck,
};
use crate::error::AppError;
use crate::idempotency::EventSource;
use crate::observability::{get_metrics, AggregatedHealth};
use crate::webhooks::WebhookEvent;

use super::routes::AppState;

type HandlerError = (StatusCode, Json<ApiResponse<()>>);
type WebhookResult = Result<Json<ApiResponse<WebhookAck>>, HandlerError>;

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<AggregatedHealth>> {
    Json(ApiResponse::success(state.health_checker.check_all().await))
}

/// Readiness check endpoint.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.health_checker.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Liveness check endpoint.
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// Prometheus scrape endpoint.
pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics not enabled").into_response(),
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Payment provider callback.
pub async fn payment_webhook(State(state): State<AppState>, body: Bytes) -> WebhookResult {
    let source = EventSource::PaymentProvider;
    let payload: PaymentWebhookPayload = parse_payload(source, &body)?;
    payload
        .validate()
        .map_err(|errors| validation_failure(source, errors))?;

    dispatch(&state, payload.into_event()).await
}

/// Shipping provider callback.
pub async fn shipping_webhook(State(state): State<AppState>, body: Bytes) -> WebhookResult {
    let source = EventSource::ShippingProvider;
    let payload: ShippingWebhookPayload = parse_payload(source, &body)?;
    payload
        .validate()
        .map_err(|errors| validation_failure(source, errors))?;

    dispatch(&state, payload.into_event()).await
}

fn parse_payload<P: DeserializeOwned>(source: EventSource, body: &[u8]) -> Result<P, HandlerError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(source = %source, error = %e, "Rejected webhook with invalid JSON");
        get_metrics().record_webhook_rejected(source.as_str(), "invalid_json");
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(ErrorResponse::new(
                "VALIDATION_ERROR",
                format!("Invalid JSON payload: {}", e),
            ))),
        )
    })
}

fn validation_failure(source: EventSource, errors: Vec<ValidationError>) -> HandlerError {
    tracing::warn!(source = %source, errors = errors.len(), "Rejected malformed webhook");
    get_metrics().record_webhook_rejected(source.as_str(), "missing_fields");

    let details: Vec<ValidationErrorDetail> = errors
        .into_iter()
        .map(|e| ValidationErrorDetail {
            field: e.field,
            message: e.message,
        })
        .collect();

    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            ErrorResponse::new("VALIDATION_ERROR", "Webhook payload validation failed")
                .with_details(details),
        )),
    )
}

async fn dispatch(state: &AppState, event: WebhookEvent) -> WebhookResult {
    match state.processor.process(&event).await {
        Ok(outcome) => Ok(Json(ApiResponse::success(WebhookAck::from(outcome)))),
        Err(e) => {
            match &e {
                AppError::Validation(_) => {
                    tracing::warn!(key = %event.idempotency_key(), "Webhook rejected: {}", e)
                }
                _ => tracing::error!(key = %event.idempotency_key(), "Webhook processing failed: {}", e),
            }
            Err((
                e.status_code(),
                Json(ApiResponse::<()>::error(ErrorResponse::new(
                    e.error_code(),
                    e.to_string(),
                ))),
            ))
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Ledger snapshot and processor counters.
pub async fn idempotency_stats(
    State(state): State<AppState>,
) -> Json<ApiResponse<IdempotencyStatsResponse>> {
    let ledger = state.processor.ledger().stats();
    let events = state.processor.metrics().snapshot();
    Json(ApiResponse::success(IdempotencyStatsResponse::new(ledger, events)))
}
