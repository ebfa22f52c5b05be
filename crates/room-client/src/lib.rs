//! Room Client Library
//!
//! Client-side room session handling: everything between picking a room and
//! rendering its participant grid.
//!
//! # Architecture
//!
//! ```text
//! RoomDirectoryPoller -> RoomDirectory        (room list, polled)
//! ControllerHandle -> SessionController actor
//!                       -> SessionBootstrapper (permissions, token, audio)
//!                       -> MediaTransport      (connect, events)
//!                       -> SessionMachine      (state, roster, layout)
//! ```
//!
//! # Modules
//!
//! - `account` - Sign-up and sign-in over an account store
//! - `audio` - Shared audio session and its scoped guard
//! - `bootstrap` - Pre-connect steps of a session attempt
//! - `config` - Client configuration from environment
//! - `controller` - Session actor and its handle
//! - `directory` - Room list cache and poller
//! - `errors` - Error types with user-facing messages
//! - `layout` - Participant tile layout
//! - `permissions` - Camera and microphone permission requests
//! - `state` - Session state machine
//! - `token_provider` - Token server client
//! - `transport` - Media transport seam and events

pub mod account;
pub mod audio;
pub mod bootstrap;
pub mod config;
pub mod controller;
pub mod directory;
pub mod errors;
pub mod layout;
pub mod permissions;
pub mod state;
pub mod token_provider;
pub mod transport;

pub use controller::{ControllerHandle, SessionController, SessionDeps, SessionTarget};
pub use directory::{PollerHandle, RoomDirectory, RoomDirectoryPoller};
pub use state::{LeaveReport, SessionSnapshot, SessionState};
