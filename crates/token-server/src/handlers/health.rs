//! Liveness probe handler.

/// Handler for GET /health
///
/// Returns "OK" while the process is serving. Does not check the media
/// service.
pub async fn health_check() -> &'static str {
    "OK"
}
