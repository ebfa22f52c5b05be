//! Metrics definitions for the token server.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ts_` prefix for the token server
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: the known routes plus "/other"
//! - `status`: success, error, timeout

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle
/// used by the `/metrics` endpoint.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ts_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Room API calls cross the network to the media service
        .set_buckets_for_metric(
            Matcher::Prefix("ts_room_list_request".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set room list buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `ts_http_requests_total`, `ts_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("ts_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("ts_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto the bounded endpoint label set.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/listRooms" => "/listRooms",
        "/getToken" => "/getToken",
        "/health" => "/health",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

// ============================================================================
// Domain Metrics
// ============================================================================

/// Record a token issuance attempt
///
/// Metric: `ts_tokens_issued_total`
/// Labels: `status`
pub fn record_token_issued(status: &'static str) {
    counter!("ts_tokens_issued_total", "status" => status).increment(1);
}

/// Record a room listing call against the media service
///
/// Metric: `ts_room_list_requests_total`, `ts_room_list_request_duration_seconds`
/// Labels: `status`
pub fn record_room_list_request(status: &'static str, duration: Duration) {
    histogram!("ts_room_list_request_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());

    counter!("ts_room_list_requests_total", "status" => status).increment(1);
}
