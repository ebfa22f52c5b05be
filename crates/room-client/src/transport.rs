//! Media transport seam.
//!
//! The media SDK is driven through [`MediaTransport`]; everything it
//! reports comes back as [`MediaEvent`] values on an mpsc channel that the
//! session controller drains. SDK callbacks only send events and never
//! touch session state.

use crate::errors::TransportError;
use common::secret::SecretString;
use tokio::sync::mpsc;

/// Buffer size of the media event channel.
pub const MEDIA_EVENT_BUFFER: usize = 256;

/// Events reported by the media transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// The signalling connection is up.
    Connected,

    /// The room is ready for participant rendering.
    RoomReady,

    /// A remote participant joined.
    ParticipantJoined { identity: String, name: String },

    /// A remote participant left.
    ParticipantLeft { identity: String },

    /// A participant published a camera track.
    TrackPublished { identity: String },

    /// A participant unpublished its camera track.
    TrackUnpublished { identity: String },

    /// The set of currently speaking participants changed.
    SpeakingChanged { speakers: Vec<String> },

    /// The connection dropped.
    Disconnected { reason: String },
}

/// Sending half handed to the transport implementation.
pub type MediaEventSender = mpsc::Sender<MediaEvent>;

/// Receiving half handed to the session controller.
pub type MediaEventReceiver = mpsc::Receiver<MediaEvent>;

/// Create the channel connecting a transport to a controller.
pub fn media_event_channel() -> (MediaEventSender, MediaEventReceiver) {
    mpsc::channel(MEDIA_EVENT_BUFFER)
}

/// Real-time media session.
#[async_trait::async_trait]
pub trait MediaTransport: Send + Sync {
    /// Connect to `url` presenting `token`.
    async fn connect(&self, url: &str, token: &SecretString) -> Result<(), TransportError>;

    /// Disconnect. Safe to call when not connected.
    async fn disconnect(&self);

    /// Publish or mute the local camera.
    async fn set_camera_enabled(&self, enabled: bool) -> Result<(), TransportError>;

    /// Publish or mute the local microphone.
    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), TransportError>;
}
