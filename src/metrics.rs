//! Prometheus metrics for request handling.
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests that never call [`install_recorder`] pay nothing.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

use crate::logging::Logger;

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// HTTP requests counter metric name.
pub const METRIC_HTTP_REQUESTS: &str = "http_requests_total";
/// JSON encode failures counter metric name.
pub const METRIC_JSON_ENCODE_FAILURES: &str = "json_encode_failures_total";

/// Install the Prometheus recorder and register metric descriptions.
/// Call this once at startup.
pub fn install_recorder(logger: &Logger) -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics(logger);
    Ok(handle)
}

/// Initialize all metric descriptions.
pub fn init_metrics(logger: &Logger) {
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_counter!(METRIC_HTTP_REQUESTS, "Total number of HTTP requests served");
    describe_counter!(
        METRIC_JSON_ENCODE_FAILURES,
        "Total number of responses that failed to encode as JSON"
    );

    logger.in_scope(|| debug!("Metrics initialized"));
}

/// Record one served request.
pub fn record_http_request(start: Instant, method: &str, endpoint: &str, status: u16) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(latency_ms);
    counter!(
        METRIC_HTTP_REQUESTS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Increment the JSON encode failure counter.
pub fn inc_json_encode_failures() {
    counter!(METRIC_JSON_ENCODE_FAILURES).increment(1);
}
