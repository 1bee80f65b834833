//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, legacy failures, uploads)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, kind
//! - `gateway_request_duration_seconds` (histogram): latency by kind
//! - `gateway_legacy_failures_total` (counter): application runs that failed
//! - `gateway_uploads_total` (counter): uploaded parts by outcome
//!
//! # Design Decisions
//! - `kind` is `static`, `legacy` or `error`; paths are never labels
//! - Recording before `init_metrics` is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Starts the Prometheus exporter on `addr`. Needs a running tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(err) => tracing::error!(address = %addr, error = %err, "Failed to install metrics exporter"),
    }
}

/// Records one finished request.
pub fn record_request(method: &str, status: u16, kind: &'static str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "kind" => kind
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "kind" => kind).record(start.elapsed().as_secs_f64());
}

pub fn record_legacy_failure() {
    counter!("gateway_legacy_failures_total").increment(1);
}

/// `outcome` is `stored` or `empty`.
pub fn record_upload(outcome: &'static str) {
    counter!("gateway_uploads_total", "outcome" => outcome).increment(1);
}
