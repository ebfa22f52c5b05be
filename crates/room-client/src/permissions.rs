//! Camera and microphone permission acquisition.

use crate::errors::DeviceError;
use std::fmt;
use tracing::{debug, warn};

/// A device capability a session may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Camera,
    Microphone,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Camera => write!(f, "camera"),
            Capability::Microphone => write!(f, "microphone"),
        }
    }
}

/// Platform permission prompt.
#[async_trait::async_trait]
pub trait DevicePermissions: Send + Sync {
    /// Ask for `capability`. Resolves once the user has answered.
    async fn request(&self, capability: Capability) -> Result<(), DeviceError>;
}

/// What the user granted for a session attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceGrants {
    pub camera: bool,
    pub microphone: bool,
}

impl DeviceGrants {
    /// Both capabilities granted.
    pub const ALL: DeviceGrants = DeviceGrants {
        camera: true,
        microphone: true,
    };

    /// Whether `capability` was granted.
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Camera => self.camera,
            Capability::Microphone => self.microphone,
        }
    }
}

/// Request camera then microphone. Denials are logged and recorded; the
/// caller proceeds degraded.
pub async fn acquire_grants(permissions: &dyn DevicePermissions) -> DeviceGrants {
    let mut grants = DeviceGrants::default();

    for capability in [Capability::Camera, Capability::Microphone] {
        match permissions.request(capability).await {
            Ok(()) => {
                debug!(target: "room.permissions", capability = %capability, "Permission granted");
                match capability {
                    Capability::Camera => grants.camera = true,
                    Capability::Microphone => grants.microphone = true,
                }
            }
            Err(e) => {
                warn!(
                    target: "room.permissions",
                    capability = %capability,
                    error = %e,
                    "Permission not granted, continuing without it"
                );
            }
        }
    }

    grants
}
