//! Room access tokens shared across FirstMeet services.
//!
//! The media service accepts HS256 JWTs signed with its API secret. The
//! issuer is the API key, the subject is the participant identity, and the
//! permissions live in a `video` grant:
//!
//! ```json
//! {
//!   "iss": "<api key>",
//!   "sub": "guest-a1b2c3",
//!   "nbf": 1700000000,
//!   "exp": 1700021600,
//!   "video": { "roomJoin": true, "room": "abc", "canPublish": true, "canSubscribe": true }
//! }
//! ```
//!
//! # Security
//!
//! - The API secret is held as a `SecretString` and redacted in Debug output
//! - The `sub` claim is redacted in Debug output
//! - Tokens are size-checked BEFORE parsing on verification
//! - Only HS256 is accepted on verification

use crate::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum accepted JWT size in bytes (8KB), checked before any parsing.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default room token lifetime (6 hours, the media service's own default).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Shortest configurable room token lifetime.
pub const MIN_TOKEN_TTL: Duration = Duration::from_secs(60);

/// Longest configurable room token lifetime.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifetime of the short service tokens used against the room API.
pub const SERVICE_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

// =============================================================================
// Error Types
// =============================================================================

/// Errors creating or verifying room access tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Signature, structure, issuer or time claims failed validation.
    #[error("The access token is invalid or expired")]
    Invalid,

    /// Signing failed.
    #[error("Token signing failed: {0}")]
    Signing(String),
}

// =============================================================================
// Claims Types
// =============================================================================

/// Media permissions carried by a room access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    /// Permission to join `room`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_join: bool,

    /// Room the grant applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    /// Permission to publish tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_publish: Option<bool>,

    /// Permission to subscribe to other participants' tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_subscribe: Option<bool>,

    /// Permission to list rooms through the room API.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_list: bool,
}

impl VideoGrant {
    /// Grant to join `room` and publish/subscribe freely.
    #[must_use]
    pub fn join(room: impl Into<String>) -> Self {
        Self {
            room_join: true,
            room: Some(room.into()),
            can_publish: Some(true),
            can_subscribe: Some(true),
            room_list: false,
        }
    }

    /// Grant to call the room listing API.
    #[must_use]
    pub fn room_list() -> Self {
        Self {
            room_list: true,
            ..Self::default()
        }
    }
}

/// Claims of a room access token.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer: the media API key.
    pub iss: String,

    /// Subject: participant identity. Redacted in Debug output.
    pub sub: String,

    /// Not-before timestamp (Unix epoch seconds).
    pub nbf: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Media permissions.
    pub video: VideoGrant,
}

impl fmt::Debug for AccessTokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("nbf", &self.nbf)
            .field("exp", &self.exp)
            .field("name", &self.name)
            .field("video", &self.video)
            .finish()
    }
}

// =============================================================================
// Signer
// =============================================================================

/// Signs and verifies room access tokens with the media API key pair.
#[derive(Clone)]
pub struct AccessTokenSigner {
    api_key: String,
    api_secret: SecretString,
}

impl fmt::Debug for AccessTokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenSigner")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl AccessTokenSigner {
    /// Create a signer for the given API key and secret.
    #[must_use]
    pub fn new(api_key: String, api_secret: SecretString) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }

    /// The API key used as issuer.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Sign a token for `identity` carrying `grant`, valid for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Signing` if encoding fails.
    pub fn sign(
        &self,
        identity: &str,
        name: Option<&str>,
        grant: VideoGrant,
        ttl: Duration,
    ) -> Result<String, JwtError> {
        let now = chrono::Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        let claims = AccessTokenClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            nbf: now,
            exp: now.saturating_add(ttl_secs),
            name: name.map(str::to_string),
            video: grant,
        };

        let key = EncodingKey::from_secret(self.api_secret.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key).map_err(|e| {
            tracing::error!(target: "common.jwt", error = %e, "Failed to sign access token");
            JwtError::Signing(e.to_string())
        })
    }

    /// Sign a short-lived service token for the room listing API.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Signing` if encoding fails.
    pub fn sign_room_list(&self) -> Result<String, JwtError> {
        let api_key = self.api_key.clone();
        self.sign(&api_key, None, VideoGrant::room_list(), SERVICE_TOKEN_TTL)
    }

    /// Verify a token issued with this key pair and return its claims.
    ///
    /// # Errors
    ///
    /// - `JwtError::TokenTooLarge` if the token exceeds [`MAX_JWT_SIZE_BYTES`]
    /// - `JwtError::Invalid` for bad signatures, wrong issuer or expired tokens
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "common.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum"
            );
            return Err(JwtError::TokenTooLarge);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.api_key.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_nbf = true;

        let key = DecodingKey::from_secret(self.api_secret.expose_secret().as_bytes());
        decode::<AccessTokenClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(target: "common.jwt", error = %e, "Token verification failed");
                JwtError::Invalid
            })
    }
}
