//! # Token Server Test Utilities
//!
//! Shared test utilities for the token server.
//!
//! This crate provides:
//! - Server test harness (`TestTokenServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ts_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestTokenServer::spawn().await?;
//!
//!     let response = reqwest::get(format!("{}/health", server.url())).await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

// Re-export commonly used items
pub use server_harness::*;
