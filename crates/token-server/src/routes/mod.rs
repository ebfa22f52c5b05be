//! HTTP routes for the token server.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::RoomServiceTrait;
use axum::{http::Method, middleware, routing::get, Router};
use common::jwt::AccessTokenSigner;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub use crate::observability::metrics::init_metrics_recorder;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Signs room access tokens with the media API key pair.
    pub signer: AccessTokenSigner,

    /// Source of the active room list.
    pub room_service: Arc<dyn RoomServiceTrait>,
}

impl AppState {
    /// Create application state, deriving the signer from `config`.
    pub fn new(config: Config, room_service: Arc<dyn RoomServiceTrait>) -> Self {
        let signer = AccessTokenSigner::new(
            config.media_api_key.clone(),
            config.media_api_secret.clone(),
        );

        Self {
            config,
            signer,
            room_service,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/listRooms` - Active rooms with participant counts
/// - `/getToken` - Room access token for `room` and `user` query values
/// - `/health` - Liveness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - CORS allowing any origin
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/listRooms", get(handlers::list_rooms))
        .route("/getToken", get(handlers::get_token))
        .route("/health", get(handlers::health_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. CorsLayer
    // 4. http_metrics_middleware (outermost)
    api_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}
