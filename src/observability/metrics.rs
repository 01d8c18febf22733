//! Metrics collection and exposition.
//!
//! # Metrics
//! - `modhost_requests_total` (counter): requests by method, status, module
//! - `modhost_request_duration_seconds` (histogram): dispatch latency
//! - `modhost_reloads_total` (counter): configuration passes by outcome
//! - `modhost_modules` (gauge): modules in the published application
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op, so tests need no setup
//! - Prometheus exporter only when `observability.metrics_enabled`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, module: &str, start: Instant) {
    metrics::counter!(
        "modhost_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "module" => module.to_string()
    )
    .increment(1);
    metrics::histogram!("modhost_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record the outcome of a configuration pass (`ok` or `failed`).
pub fn record_reload(outcome: &'static str) {
    metrics::counter!("modhost_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_module_count(count: usize) {
    metrics::gauge!("modhost_modules").set(count as f64);
}
