//! Observability for the token server.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
