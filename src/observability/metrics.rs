use metrics::{counter, gauge, histogram, describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for webhook reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Metrics;

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_webhook_received(&self, source: &str) {
        counter!("webhook_events_received_total", "source" => source.to_string()).increment(1);
    }

    pub fn record_webhook_applied(&self, source: &str) {
        counter!("webhook_events_applied_total", "source" => source.to_string()).increment(1);
    }

    pub fn record_webhook_duplicate(&self, source: &str) {
        counter!("webhook_events_duplicate_total", "source" => source.to_string()).increment(1);
    }

    pub fn record_webhook_rejected(&self, source: &str, reason: &str) {
        counter!("webhook_events_rejected_total", "source" => source.to_string(), "reason" => reason.to_string()).increment(1);
    }

    pub fn record_webhook_failed(&self, source: &str) {
        counter!("webhook_events_failed_total", "source" => source.to_string()).increment(1);
    }

    pub fn record_transition_latency(&self, source: &str, duration_ms: f64) {
        histogram!("webhook_transition_duration_ms", "source" => source.to_string()).record(duration_ms);
    }

    pub fn set_ledger_entries(&self, count: i64) {
        gauge!("idempotency_ledger_entries").set(count as f64);
    }

    pub fn record_ledger_evictions(&self, count: u64) {
        counter!("idempotency_ledger_evictions_total").increment(count);
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_ms: f64) {
        counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
        histogram!("http_request_duration_ms", "method" => method.to_string(), "path" => path.to_string()).record(duration_ms);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the Prometheus recorder and returns its handle.
///
/// Safe to call more than once; later calls return the first handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    METRICS.get_or_init(Metrics::new);

    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

/// Describes all metrics for Prometheus.
fn describe_metrics() {
    describe_counter!("webhook_events_received_total", Unit::Count, "Provider callbacks received");
    describe_counter!("webhook_events_applied_total", Unit::Count, "Callbacks whose order transition was applied");
    describe_counter!("webhook_events_duplicate_total", Unit::Count, "Callbacks skipped as duplicates");
    describe_counter!("webhook_events_rejected_total", Unit::Count, "Malformed callbacks rejected before processing");
    describe_counter!("webhook_events_failed_total", Unit::Count, "Callbacks whose order transition failed");
    describe_histogram!("webhook_transition_duration_ms", Unit::Milliseconds, "Order store transition latency in milliseconds");

    describe_gauge!("idempotency_ledger_entries", Unit::Count, "Entries currently held by the idempotency ledger");
    describe_counter!("idempotency_ledger_evictions_total", Unit::Count, "Expired idempotency entries evicted");

    describe_counter!("http_requests_total", Unit::Count, "Total HTTP requests");
    describe_histogram!("http_request_duration_ms", Unit::Milliseconds, "HTTP request latency in milliseconds");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
