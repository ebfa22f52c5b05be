//! Token server client.
//!
//! The [`TokenProvider`] trait is the seam between room sessions and the
//! token server; [`HttpTokenProvider`] speaks its two-endpoint HTTP
//! contract:
//!
//! - `GET /listRooms` -> `{ "rooms": [{ "name", "numParticipants" }] }`
//! - `GET /getToken?room=&user=` -> `{ "token": "<jwt>" }`
//!
//! No retries happen here. Callers decide whether to try again.

use crate::errors::ProviderError;
use common::secret::SecretString;
use common::types::{ListRoomsResponse, RoomSummary};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{instrument, warn};

/// Connect timeout for token server requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Signed permission to join one room as one identity.
///
/// Owned by a single connection attempt and discarded on leave or failure.
#[derive(Clone)]
pub struct JoinCredential {
    /// Opaque signed token. Never logged.
    pub token: SecretString,

    /// Room the token grants access to.
    pub room: String,

    /// Identity the token was issued for.
    pub identity: String,
}

impl fmt::Debug for JoinCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinCredential")
            .field("token", &"[REDACTED]")
            .field("room", &self.room)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Issues join credentials and lists active rooms.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetch a credential for `identity` to join `room`.
    async fn fetch_token(&self, room: &str, identity: &str)
        -> Result<JoinCredential, ProviderError>;

    /// List active rooms with participant counts.
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ProviderError>;
}

#[derive(Deserialize)]
struct TokenBody {
    #[serde(default)]
    token: Option<String>,
}

/// HTTP client for the token server.
#[derive(Clone)]
pub struct HttpTokenProvider {
    client: Client,
    base_url: String,
}

impl HttpTokenProvider {
    /// Create a token server client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Token server base URL (e.g., "http://192.168.1.20:3000")
    /// * `timeout` - Bound on each request, including reading the body
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Network` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| {
                warn!(target: "room.token_provider", error = %e, "Failed to build HTTP client");
                ProviderError::Network(e.to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = request.send().await.map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "room.token_provider", status = %status, "Token server returned error");
            return Err(ProviderError::Status(status.as_u16()));
        }

        Ok(response)
    }
}

fn map_send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        warn!(target: "room.token_provider", "Token server request timed out");
        ProviderError::Timeout
    } else {
        warn!(target: "room.token_provider", error = %e, "Token server request failed");
        ProviderError::Network(e.to_string())
    }
}

fn map_body_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        warn!(target: "room.token_provider", error = %e, "Failed to parse token server response");
        ProviderError::MalformedBody(e.to_string())
    }
}

#[async_trait::async_trait]
impl TokenProvider for HttpTokenProvider {
    #[instrument(skip_all, name = "room.token_provider.fetch_token", fields(room = %room))]
    async fn fetch_token(
        &self,
        room: &str,
        identity: &str,
    ) -> Result<JoinCredential, ProviderError> {
        let request = self
            .client
            .get(format!("{}/getToken", self.base_url))
            .query(&[("room", room), ("user", identity)]);

        let body: TokenBody = self.get(request).await?.json().await.map_err(map_body_error)?;

        match body.token {
            Some(token) if !token.is_empty() => Ok(JoinCredential {
                token: SecretString::from(token),
                room: room.to_string(),
                identity: identity.to_string(),
            }),
            _ => {
                warn!(target: "room.token_provider", "Token server response had no token");
                Err(ProviderError::MissingToken)
            }
        }
    }

    #[instrument(skip_all, name = "room.token_provider.list_rooms")]
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ProviderError> {
        let request = self.client.get(format!("{}/listRooms", self.base_url));

        let body: ListRoomsResponse = self.get(request).await?.json().await.map_err(map_body_error)?;

        Ok(body.rooms)
    }
}
