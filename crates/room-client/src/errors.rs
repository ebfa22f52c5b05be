//! Room client error types.
//!
//! Every error exposes `user_message()`: a short string safe to show in the
//! UI. Display output carries detail for logs and never includes tokens.

use crate::permissions::Capability;
use thiserror::Error;

/// Failures talking to the token server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Token server unreachable: {0}")]
    Network(String),

    #[error("Token server returned status {0}")]
    Status(u16),

    #[error("Malformed token server response: {0}")]
    MalformedBody(String),

    #[error("Token server response had no token")]
    MissingToken,

    #[error("Token server request timed out")]
    Timeout,
}

/// Device permission failures. Never fatal to a session attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Permission denied for {0}")]
    PermissionDenied(Capability),

    #[error("Device unavailable: {0}")]
    Unavailable(String),
}

/// Audio session activation failures. Never fatal to a session attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AudioSessionError {
    #[error("Audio session activation failed: {0}")]
    ActivationFailed(String),
}

/// Media transport failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("Transport not connected")]
    NotConnected,

    #[error("Track operation failed: {0}")]
    Track(String),
}

/// Failures of the pre-connect phase.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BootstrapError {
    /// The join credential could not be obtained. Retriable by the user.
    #[error("Token fetch failed: {0}")]
    TokenFetchFailed(ProviderError),

    /// A session attempt is already in progress.
    #[error("A session attempt is already in progress")]
    AlreadyInProgress,

    /// No identity was given and none could be generated.
    #[error("Failed to generate a guest identity")]
    IdentityUnavailable,

    /// The attempt was abandoned by a leave or shutdown before it finished.
    #[error("Session attempt cancelled")]
    Cancelled,

    /// The controller is no longer running.
    #[error("Session controller stopped")]
    ControllerStopped,
}

impl BootstrapError {
    /// Message safe to show to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            BootstrapError::TokenFetchFailed(_) | BootstrapError::IdentityUnavailable => {
                "Failed to get a room token. Please try again."
            }
            BootstrapError::AlreadyInProgress => "Already joining a room.",
            BootstrapError::Cancelled => "Joining was cancelled.",
            BootstrapError::ControllerStopped => "The room session has ended.",
        }
    }
}

/// Failures of the connected session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// `join` was called without a held credential.
    #[error("No credential held; bootstrap before joining")]
    NotReadyToJoin,

    /// The transport could not connect.
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Connect plus room-ready exceeded the configured bound.
    #[error("Timed out waiting for the room to become ready")]
    ConnectTimeout,

    /// The transport dropped the connection. Ends the session.
    #[error("Transport disconnected: {0}")]
    TransportDisconnected(String),

    /// A camera or microphone toggle failed.
    #[error("Track operation failed: {0}")]
    Track(String),

    /// The attempt failed before connecting.
    #[error("Session attempt failed: {0}")]
    Bootstrap(BootstrapError),

    /// The controller is no longer running.
    #[error("Session controller stopped")]
    ControllerStopped,
}

impl SessionError {
    /// Message safe to show to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::NotReadyToJoin => "Room is not ready to join yet.",
            SessionError::ConnectFailed(_) | SessionError::ConnectTimeout => {
                "Could not connect to the room."
            }
            SessionError::TransportDisconnected(_) => "Disconnected from the room.",
            SessionError::Track(_) => "Could not change your camera or microphone.",
            SessionError::Bootstrap(e) => e.user_message(),
            SessionError::ControllerStopped => "The room session has ended.",
        }
    }
}

/// Room directory refresh failures. Transient; logged only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Room list fetch failed: {0}")]
    FetchFailed(ProviderError),
}

impl DirectoryError {
    /// Message safe to show to the user.
    pub fn user_message(&self) -> &'static str {
        "Failed to fetch rooms"
    }
}

/// Sign-up and sign-in failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Email and password are required")]
    MissingCredentials,

    /// The account store rejected sign-up. Carries the store's message.
    #[error("Sign-up failed: {0}")]
    SignUpFailed(String),

    /// The account store rejected sign-in. Carries the store's message.
    #[error("Sign-in failed: {0}")]
    SignInFailed(String),

    /// The profile document could not be written.
    #[error("Profile write failed: {0}")]
    ProfileWriteFailed(String),
}

impl AccountError {
    /// Message safe to show to the user.
    pub fn user_message(&self) -> String {
        match self {
            AccountError::PasswordMismatch => "Passwords do not match!".to_string(),
            AccountError::InvalidEmail => "Please enter a valid email address!".to_string(),
            AccountError::InvalidPhone => "Please enter a valid phone number!".to_string(),
            AccountError::MissingCredentials => "Please enter email and password!".to_string(),
            AccountError::SignUpFailed(message)
            | AccountError::SignInFailed(message)
            | AccountError::ProfileWriteFailed(message) => message.clone(),
        }
    }
}
