//! HTTP metrics middleware.
//!
//! Records every response, including the ones produced before a handler
//! runs (404 for unknown paths, 405 for wrong methods, 400 for query
//! strings that fail to parse).

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records method, endpoint, status and duration of each
/// request. Applied as the outermost layer.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}
