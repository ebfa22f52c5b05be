//! Shared audio session handling.
//!
//! The platform audio session is process-wide. Sessions reach it through an
//! explicit `Arc<dyn AudioSession>` and hold it through an
//! [`AudioSessionGuard`], which deactivates it exactly once: on
//! [`AudioSessionGuard::release`] or on drop, whichever comes first.

use crate::errors::AudioSessionError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Platform audio session.
#[async_trait::async_trait]
pub trait AudioSession: Send + Sync {
    /// Activate the audio session for a call.
    async fn activate(&self) -> Result<(), AudioSessionError>;

    /// Deactivate the audio session. Called at most once per successful
    /// activation.
    fn deactivate(&self);
}

/// Scoped hold on the shared audio session.
pub struct AudioSessionGuard {
    session: Option<Arc<dyn AudioSession>>,
}

impl AudioSessionGuard {
    /// Activate `session` and return a guard for it.
    ///
    /// Activation failure is logged and yields a guard that holds nothing;
    /// the session attempt continues without it.
    pub async fn acquire(session: Arc<dyn AudioSession>) -> Self {
        match session.activate().await {
            Ok(()) => {
                debug!(target: "room.audio", "Audio session activated");
                Self {
                    session: Some(session),
                }
            }
            Err(e) => {
                warn!(target: "room.audio", error = %e, "Audio session activation failed, continuing");
                Self::empty()
            }
        }
    }

    /// A guard that holds nothing.
    pub fn empty() -> Self {
        Self { session: None }
    }

    /// Whether the audio session is currently held.
    pub fn is_acquired(&self) -> bool {
        self.session.is_some()
    }

    /// Deactivate now. A no-op if nothing is held.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(session) = self.session.take() {
            session.deactivate();
            debug!(target: "room.audio", "Audio session released");
        }
    }
}

impl Drop for AudioSessionGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for AudioSessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSessionGuard")
            .field("acquired", &self.is_acquired())
            .finish()
    }
}
