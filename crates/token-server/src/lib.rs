//! Token Server Library
//!
//! The token server mints short-lived room access tokens for the media
//! service and proxies its room listing:
//!
//! - `GET /listRooms` - active rooms with participant counts
//! - `GET /getToken?room=&user=` - signed room access token
//! - `GET /health` - liveness probe
//! - `GET /metrics` - Prometheus metrics
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Request models
//! - `observability` - Metrics definitions
//! - `routes` - Axum router setup
//! - `services` - Media service room API client

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
