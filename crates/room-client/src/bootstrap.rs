//! Pre-connect session setup.
//!
//! A session attempt runs three steps in order:
//!
//! 1. Request camera and microphone permissions (denial is non-fatal)
//! 2. Fetch a join credential for (room, identity), bounded by a timeout
//! 3. Activate the shared audio session through a scoped guard
//!    (activation failure is non-fatal)
//!
//! Only step 2 can fail the attempt.

use crate::audio::{AudioSession, AudioSessionGuard};
use crate::errors::{BootstrapError, ProviderError};
use crate::permissions::{acquire_grants, DeviceGrants, DevicePermissions};
use crate::token_provider::{JoinCredential, TokenProvider};
use common::types::{generate_guest_identity, DEFAULT_ROOM_NAME};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Everything a successful attempt holds before connecting.
#[derive(Debug)]
pub struct Bootstrapped {
    pub credential: JoinCredential,
    pub audio: AudioSessionGuard,
    pub grants: DeviceGrants,
}

/// Runs the pre-connect steps against injected collaborators.
#[derive(Clone)]
pub struct SessionBootstrapper {
    permissions: Arc<dyn DevicePermissions>,
    tokens: Arc<dyn TokenProvider>,
    audio: Arc<dyn AudioSession>,
    token_fetch_timeout: Duration,
}

impl SessionBootstrapper {
    pub fn new(
        permissions: Arc<dyn DevicePermissions>,
        tokens: Arc<dyn TokenProvider>,
        audio: Arc<dyn AudioSession>,
        token_fetch_timeout: Duration,
    ) -> Self {
        Self {
            permissions,
            tokens,
            audio,
            token_fetch_timeout,
        }
    }

    /// Run all three steps for `room_name` as `user_identity`.
    ///
    /// An empty room name means "default-room"; an empty identity means a
    /// generated guest identity.
    #[instrument(skip_all, name = "room.bootstrap", fields(room = %room_name))]
    pub async fn bootstrap(
        &self,
        room_name: &str,
        user_identity: &str,
    ) -> Result<Bootstrapped, BootstrapError> {
        let (room, identity) = resolve_target(room_name, user_identity)?;
        let grants = self.acquire_permissions().await;
        let credential = self.fetch_credential(&room, &identity).await?;
        let audio = self.activate_audio().await;

        Ok(Bootstrapped {
            credential,
            audio,
            grants,
        })
    }

    /// Step 1: request device permissions.
    pub async fn acquire_permissions(&self) -> DeviceGrants {
        acquire_grants(self.permissions.as_ref()).await
    }

    /// Step 2: fetch the join credential within the configured bound.
    pub async fn fetch_credential(
        &self,
        room: &str,
        identity: &str,
    ) -> Result<JoinCredential, BootstrapError> {
        let fetch = self.tokens.fetch_token(room, identity);

        match tokio::time::timeout(self.token_fetch_timeout, fetch).await {
            Ok(Ok(credential)) => {
                info!(target: "room.bootstrap", room = %room, "Join credential acquired");
                Ok(credential)
            }
            Ok(Err(e)) => {
                warn!(target: "room.bootstrap", room = %room, error = %e, "Token fetch failed");
                Err(BootstrapError::TokenFetchFailed(e))
            }
            Err(_) => {
                warn!(
                    target: "room.bootstrap",
                    room = %room,
                    timeout_ms = u64::try_from(self.token_fetch_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Token fetch timed out"
                );
                Err(BootstrapError::TokenFetchFailed(ProviderError::Timeout))
            }
        }
    }

    /// Step 3: activate the shared audio session.
    pub async fn activate_audio(&self) -> AudioSessionGuard {
        AudioSessionGuard::acquire(self.audio.clone()).await
    }
}

/// Apply the room and identity defaults.
pub fn resolve_target(
    room_name: &str,
    user_identity: &str,
) -> Result<(String, String), BootstrapError> {
    let room = if room_name.is_empty() {
        DEFAULT_ROOM_NAME.to_string()
    } else {
        room_name.to_string()
    };

    let identity = if user_identity.is_empty() {
        generate_guest_identity().map_err(|_| BootstrapError::IdentityUnavailable)?
    } else {
        user_identity.to_string()
    };

    Ok((room, identity))
}
