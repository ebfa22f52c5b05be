//! HTTP middleware for the token server.

pub mod http_metrics;

pub use http_metrics::http_metrics_middleware;
