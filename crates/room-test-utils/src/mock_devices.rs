//! Device permission and audio session mocks.

use room_client::audio::AudioSession;
use room_client::errors::{AudioSessionError, DeviceError};
use room_client::permissions::{Capability, DevicePermissions};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Permission prompt with fixed answers.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions {
    camera: bool,
    microphone: bool,
}

impl StaticPermissions {
    #[must_use]
    pub fn granting() -> Self {
        Self {
            camera: true,
            microphone: true,
        }
    }

    #[must_use]
    pub fn denying() -> Self {
        Self {
            camera: false,
            microphone: false,
        }
    }

    #[must_use]
    pub fn camera_only() -> Self {
        Self {
            camera: true,
            microphone: false,
        }
    }
}

#[async_trait::async_trait]
impl DevicePermissions for StaticPermissions {
    async fn request(&self, capability: Capability) -> Result<(), DeviceError> {
        let granted = match capability {
            Capability::Camera => self.camera,
            Capability::Microphone => self.microphone,
        };
        if granted {
            Ok(())
        } else {
            Err(DeviceError::PermissionDenied(capability))
        }
    }
}

/// Audio session counting activations and deactivations.
#[derive(Debug, Default)]
pub struct RecordingAudioSession {
    fail: AtomicBool,
    activations: AtomicUsize,
    deactivations: AtomicUsize,
}

impl RecordingAudioSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose activation always fails.
    #[must_use]
    pub fn failing() -> Self {
        let session = Self::default();
        session.fail.store(true, Ordering::SeqCst);
        session
    }

    #[must_use]
    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }

    /// Whether an activation is outstanding.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.activations() > self.deactivations()
    }
}

#[async_trait::async_trait]
impl AudioSession for RecordingAudioSession {
    async fn activate(&self) -> Result<(), AudioSessionError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AudioSessionError::ActivationFailed(
                "audio route busy".to_string(),
            ));
        }
        self.activations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn deactivate(&self) {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
    }
}
