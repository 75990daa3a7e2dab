//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, target
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_affinity_decisions_total` (counter): interceptor outcomes by service
//! - `gateway_instance_pool_size` (gauge): last observed pool size per service
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels stay low-cardinality (no client keys)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, target: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "target" => target.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "target" => target.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record an interceptor outcome (`selected`, `no_instance`, `no_resolver`,
/// `provider_failure`, `timeout`).
pub fn record_affinity_decision(service: &str, outcome: &'static str) {
    counter!(
        "gateway_affinity_decisions_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_pool_size(service: &str, size: usize) {
    gauge!("gateway_instance_pool_size", "service" => service.to_string()).set(size as f64);
}
