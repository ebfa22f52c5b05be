//! Common data types for FirstMeet components.
//!
//! These are the wire types of the token server's two public endpoints and
//! the identity defaults both sides agree on.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Room used when a token request does not name one.
pub const DEFAULT_ROOM_NAME: &str = "default-room";

/// Prefix of generated guest identities.
pub const GUEST_IDENTITY_PREFIX: &str = "guest-";

/// Number of random characters after [`GUEST_IDENTITY_PREFIX`].
pub const GUEST_SUFFIX_LEN: usize = 6;

const GUEST_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Largest multiple of the alphabet size that fits in a byte. Bytes at or
/// above it are rejected so every character is equally likely.
const GUEST_REJECTION_BOUND: u8 = 252;

/// A room as reported by the media service.
///
/// `name` is the unique key. Serialized in the camelCase shape mobile
/// clients already consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Unique room name.
    pub name: String,

    /// Participants currently in the room.
    #[serde(rename = "numParticipants", default)]
    pub num_participants: u32,
}

impl RoomSummary {
    /// Create a room summary.
    #[must_use]
    pub fn new(name: impl Into<String>, num_participants: u32) -> Self {
        Self {
            name: name.into(),
            num_participants,
        }
    }
}

/// Body of `GET /listRooms`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRoomsResponse {
    /// Active rooms. A body without the field is an empty list.
    #[serde(default)]
    pub rooms: Vec<RoomSummary>,
}

/// Body of `GET /getToken`.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed room access token.
    pub token: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Error body returned by the token server on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable, client-safe message.
    pub error: String,
}

/// Errors generating identities.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The system CSPRNG failed to produce bytes.
    #[error("Failed to generate random bytes")]
    RandomUnavailable,
}

/// Generate a guest identity of the form `guest-[a-z0-9]{6}`.
///
/// # Errors
///
/// Returns `IdentityError::RandomUnavailable` if the system CSPRNG fails.
pub fn generate_guest_identity() -> Result<String, IdentityError> {
    let rng = SystemRandom::new();
    let mut identity = String::with_capacity(GUEST_IDENTITY_PREFIX.len() + GUEST_SUFFIX_LEN);
    identity.push_str(GUEST_IDENTITY_PREFIX);

    let mut produced = 0;
    while produced < GUEST_SUFFIX_LEN {
        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes).map_err(|_| {
            tracing::error!(target: "common.types", "Failed to generate random bytes");
            IdentityError::RandomUnavailable
        })?;

        for byte in bytes {
            if produced == GUEST_SUFFIX_LEN {
                break;
            }
            if byte >= GUEST_REJECTION_BOUND {
                continue;
            }
            let index = usize::from(byte) % GUEST_ALPHABET.len();
            if let Some(ch) = GUEST_ALPHABET.get(index) {
                identity.push(char::from(*ch));
                produced += 1;
            }
        }
    }

    Ok(identity)
}

/// Returns true if `identity` has the generated guest shape.
#[must_use]
pub fn is_guest_identity(identity: &str) -> bool {
    identity
        .strip_prefix(GUEST_IDENTITY_PREFIX)
        .is_some_and(|suffix| {
            suffix.len() == GUEST_SUFFIX_LEN
                && suffix
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        })
}
