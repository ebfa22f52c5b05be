//! Mock media transport.
//!
//! Records every call and lets tests push [`MediaEvent`]s into the
//! controller through the same channel a real SDK binding would use.
//!
//! # Example
//!
//! ```rust,ignore
//! use room_test_utils::{ConnectBehavior, MockMediaTransport};
//!
//! let (transport, media_events) = MockMediaTransport::new(ConnectBehavior::ConnectAndReady);
//! // hand `media_events` to SessionController::spawn
//!
//! transport.emit_remote_joined("bob", "Bob").await;
//! ```

use common::secret::{ExposeSecret, SecretString};
use room_client::errors::TransportError;
use room_client::transport::{
    media_event_channel, MediaEvent, MediaEventReceiver, MediaEventSender, MediaTransport,
};
use std::sync::Mutex;
use tokio::sync::Notify;

/// How `connect` behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Succeed, then emit `RoomReady`.
    ConnectAndReady,
    /// Succeed without signalling readiness.
    ConnectOnly,
    /// Fail with the given message.
    Fail(String),
    /// Never return.
    Hang,
    /// Block until [`MockMediaTransport::release_connect`], then succeed.
    Gated,
}

/// A call the controller made on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect { url: String, token: String },
    Disconnect,
    SetCamera(bool),
    SetMicrophone(bool),
}

/// Media transport recording calls.
#[derive(Debug)]
pub struct MockMediaTransport {
    behavior: Mutex<ConnectBehavior>,
    events: MediaEventSender,
    calls: Mutex<Vec<TransportCall>>,
    fail_tracks: Mutex<bool>,
    connected: Mutex<bool>,
    gate: Notify,
}

impl MockMediaTransport {
    /// Create the transport and the receiving half of its event channel.
    #[must_use]
    pub fn new(behavior: ConnectBehavior) -> (Self, MediaEventReceiver) {
        let (events, receiver) = media_event_channel();
        let transport = Self {
            behavior: Mutex::new(behavior),
            events,
            calls: Mutex::new(Vec::new()),
            fail_tracks: Mutex::new(false),
            connected: Mutex::new(false),
            gate: Notify::new(),
        };
        (transport, receiver)
    }

    pub fn set_behavior(&self, behavior: ConnectBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Make camera and microphone toggles fail.
    pub fn fail_track_toggles(&self) {
        *self.fail_tracks.lock().unwrap() = true;
    }

    /// Let a `Gated` connect return.
    pub fn release_connect(&self) {
        self.gate.notify_one();
    }

    /// Whether a connect succeeded without a later disconnect.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Connect { .. }))
    }

    #[must_use]
    pub fn disconnect_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Disconnect))
    }

    fn count(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    /// Push an event to the controller.
    pub async fn emit(&self, event: MediaEvent) {
        self.events.send(event).await.unwrap();
    }

    pub async fn emit_remote_joined(&self, identity: &str, name: &str) {
        self.emit(MediaEvent::ParticipantJoined {
            identity: identity.to_string(),
            name: name.to_string(),
        })
        .await;
    }

    pub async fn emit_disconnected(&self, reason: &str) {
        self.emit(MediaEvent::Disconnected {
            reason: reason.to_string(),
        })
        .await;
    }
}

#[async_trait::async_trait]
impl MediaTransport for MockMediaTransport {
    async fn connect(&self, url: &str, token: &SecretString) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(TransportCall::Connect {
            url: url.to_string(),
            token: token.expose_secret().to_string(),
        });

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            ConnectBehavior::ConnectAndReady => {
                *self.connected.lock().unwrap() = true;
                let _ = self.events.send(MediaEvent::Connected).await;
                let _ = self.events.send(MediaEvent::RoomReady).await;
                Ok(())
            }
            ConnectBehavior::ConnectOnly => {
                *self.connected.lock().unwrap() = true;
                Ok(())
            }
            ConnectBehavior::Fail(message) => Err(TransportError::ConnectFailed(message)),
            ConnectBehavior::Hang => std::future::pending().await,
            ConnectBehavior::Gated => {
                self.gate.notified().await;
                *self.connected.lock().unwrap() = true;
                Ok(())
            }
        }
    }

    async fn disconnect(&self) {
        self.calls.lock().unwrap().push(TransportCall::Disconnect);
        *self.connected.lock().unwrap() = false;
    }

    async fn set_camera_enabled(&self, enabled: bool) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(TransportCall::SetCamera(enabled));
        if *self.fail_tracks.lock().unwrap() {
            return Err(TransportError::Track("camera unavailable".to_string()));
        }
        Ok(())
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(TransportCall::SetMicrophone(enabled));
        if *self.fail_tracks.lock().unwrap() {
            return Err(TransportError::Track("microphone unavailable".to_string()));
        }
        Ok(())
    }
}
