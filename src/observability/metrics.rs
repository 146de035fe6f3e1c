//! Metrics collection and exposition.
//!
//! # Metrics
//! - `backend_responses_total` (counter): responses by server, status code
//! - `backend_failures_total` (counter): transport failures by server, mode
//! - `backend_ttfb_seconds` (histogram): time to response headers by server
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels for server URL and status code only; no per-path labels

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a response obtained from a backend server.
pub fn record_backend_response(server: &str, code: u16, first_byte: Duration) {
    metrics::counter!(
        "backend_responses_total",
        "server" => server.to_string(),
        "code" => code.to_string()
    )
    .increment(1);
    metrics::histogram!("backend_ttfb_seconds", "server" => server.to_string())
        .record(first_byte.as_secs_f64());
}

/// Record a transport failure. `mode` is "primary" or "mirror".
pub fn record_backend_failure(server: &str, mode: &'static str) {
    metrics::counter!(
        "backend_failures_total",
        "server" => server.to_string(),
        "mode" => mode
    )
    .increment(1);
}
