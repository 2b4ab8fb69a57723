//! Prometheus metrics.
//!
//! # Design Decisions
//! - Metrics are fire-and-forget: recording never fails a request
//! - Inbound requests are labeled by route template, not raw path
//! - Gateway calls are labeled by operation name and outcome, so a
//!   misbehaving backend endpoint is visible per operation

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(error) => tracing::error!(%error, "failed to install metrics exporter"),
    }
}

/// Record one inbound HTTP request.
pub fn record_http_request(method: &str, route: &str, status: u16, elapsed: Duration) {
    counter!(
        "portal_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!("portal_request_duration_seconds", "route" => route.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record one gateway call to the backend API.
pub fn record_gateway_call(operation: &str, success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "portal_gateway_calls_total",
        "operation" => operation.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
    histogram!("portal_gateway_call_duration_seconds", "operation" => operation.to_string())
        .record(elapsed.as_secs_f64());
}
