//! # Room Client Test Utilities
//!
//! Mock collaborators for isolated room-client testing, with no media SDK,
//! token server or account backend required.
//!
//! ## Modules
//!
//! - `mock_tokens` - Scripted token provider
//! - `mock_transport` - Media transport that records calls and emits events
//! - `mock_devices` - Device permissions and audio session
//! - `mock_accounts` - In-memory account store
//! - `session` - `TestSession`, a controller wired to all of the above
//!
//! ## Usage
//!
//! ```rust,ignore
//! use room_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let session = TestSession::builder().build();
//!
//!     session.handle.bootstrap("abc", "alice").await.unwrap();
//!     session.handle.join().await.unwrap();
//!     session.wait_for_state(SessionState::Ready).await;
//! }
//! ```

pub mod mock_accounts;
pub mod mock_devices;
pub mod mock_tokens;
pub mod mock_transport;
pub mod session;

pub use mock_accounts::MockAccountStore;
pub use mock_devices::{RecordingAudioSession, StaticPermissions};
pub use mock_tokens::MockTokenProvider;
pub use mock_transport::{ConnectBehavior, MockMediaTransport, TransportCall};
pub use room_client::SessionState;
pub use session::{TestSession, TestSessionBuilder};
