//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, cache outcomes, rejections)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, cache
//! - `gateway_request_duration_seconds` (histogram): latency by cache outcome
//! - `gateway_cache_lookups_total` (counter): hit / miss / error
//! - `gateway_cache_writes_total` (counter): stored / skipped / failed
//! - `gateway_rejections_total` (counter): policy rejections by reason
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed (tests, CLI)
//! - Low-cardinality labels only; never the path or cache key

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed proxy request.
pub fn record_request(method: &str, status: u16, cache: &'static str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "cache" => cache
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "cache" => cache)
        .record(start.elapsed().as_secs_f64());
}

/// Record a cache lookup outcome (`hit`, `miss`, `error`).
pub fn record_cache_lookup(outcome: &'static str) {
    counter!("gateway_cache_lookups_total", "outcome" => outcome).increment(1);
}

/// Record a cache write outcome (`stored`, `skipped`, `failed`).
pub fn record_cache_write(outcome: &'static str) {
    counter!("gateway_cache_writes_total", "outcome" => outcome).increment(1);
}

/// Record a request rejected by policy.
pub fn record_rejection(reason: &'static str) {
    counter!("gateway_rejections_total", "reason" => reason).increment(1);
}
