//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports types from the [`secrecy`] crate. Use these for the media API
//! secret and for issued room tokens: `Debug` output is redacted and the
//! value is zeroized on drop.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Credential {
//!     room: String,
//!     token: SecretString,
//! }
//!
//! let credential = Credential {
//!     room: "abc".to_string(),
//!     token: SecretString::from("eyJhbGciOi..."),
//! };
//!
//! // Room is visible, token is redacted
//! assert!(!format!("{credential:?}").contains("eyJhbGciOi"));
//! assert_eq!(credential.token.expose_secret(), "eyJhbGciOi...");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
