use grounds_webhooks::api::{create_router, AppState};
use grounds_webhooks::config::Settings;
use grounds_webhooks::idempotency::{IdempotencyLedger, IdempotencySweepJob};
use grounds_webhooks::observability::{init_logging, init_metrics, LogConfig};
use grounds_webhooks::orders::InMemoryOrderStore;
use grounds_webhooks::webhooks::WebhookProcessor;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let settings = Settings::new()?;

    init_logging(&LogConfig::from(&settings.application));
    info!("Configuration loaded");

    let ledger = Arc::new(IdempotencyLedger::new(settings.idempotency.retention())?);
    info!(
        retention_seconds = settings.idempotency.retention_seconds,
        "Idempotency ledger ready"
    );

    match settings.idempotency.sweep_interval() {
        Some(interval) => {
            IdempotencySweepJob::new(ledger.clone(), interval).start();
            info!(interval_seconds = interval.as_secs(), "Ledger sweep scheduled");
        }
        None => warn!("Ledger sweep disabled, relying on lazy eviction only"),
    }

    let order_store = Arc::new(InMemoryOrderStore::new());
    let processor = Arc::new(WebhookProcessor::new(ledger, order_store));

    let mut state = AppState::new(processor);
    match init_metrics() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!("Prometheus recorder not installed: {}", e),
    }

    let address = settings.application.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening for provider webhooks on {}", address);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
