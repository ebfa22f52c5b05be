//! Session state machine.
//!
//! [`SessionMachine::apply`] is the single transition function for a room
//! session. It owns the credential, the audio guard and the participant
//! roster, and returns the side effects the caller must perform. It never
//! performs I/O itself.
//!
//! ```text
//! Idle -> AcquiringPermissions -> FetchingToken --join--> Connecting
//!      -> ConnectedAwaitingReady -> Ready --leave--> Leaving -> Idle
//!
//! token fetch failure, transport disconnect, connect failure or timeout
//!      -> Failed
//! ```
//!
//! Whenever the machine leaves a connected state, the credential, the
//! audio guard and the roster are cleared together.

use crate::audio::AudioSessionGuard;
use crate::bootstrap::Bootstrapped;
use crate::errors::{BootstrapError, SessionError, TransportError};
use crate::layout::{arrange, Layout, ParticipantTrack};
use crate::permissions::DeviceGrants;
use crate::token_provider::JoinCredential;
use crate::transport::MediaEvent;
use common::secret::SecretString;
use std::fmt;
use tracing::{debug, info, warn};

/// Lifecycle of a room session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AcquiringPermissions,
    FetchingToken,
    Connecting,
    ConnectedAwaitingReady,
    Ready,
    Leaving,
    Failed,
}

impl SessionState {
    /// Whether a session attempt is underway.
    pub fn is_in_progress(self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Failed)
    }

    /// Whether the transport may hold a connection.
    pub fn holds_transport(self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::ConnectedAwaitingReady | SessionState::Ready
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::AcquiringPermissions => "acquiring_permissions",
            SessionState::FetchingToken => "fetching_token",
            SessionState::Connecting => "connecting",
            SessionState::ConnectedAwaitingReady => "connected_awaiting_ready",
            SessionState::Ready => "ready",
            SessionState::Leaving => "leaving",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Inputs to the state machine.
#[derive(Debug)]
pub enum SessionInput {
    /// The user started a session attempt.
    BootstrapStarted { room: String, identity: String },

    /// Permissions were answered for attempt `attempt`.
    PermissionsAcquired { attempt: u64, grants: DeviceGrants },

    /// Attempt `attempt` finished its pre-connect phase.
    BootstrapFinished {
        attempt: u64,
        result: Result<Bootstrapped, BootstrapError>,
    },

    /// The user confirmed joining.
    Join,

    /// The transport connect call for `attempt` returned.
    ConnectFinished {
        attempt: u64,
        result: Result<(), TransportError>,
    },

    /// The connect/ready bound for `attempt` elapsed.
    ConnectTimedOut { attempt: u64 },

    /// The media transport reported an event.
    Media(MediaEvent),

    /// The local camera was toggled.
    CameraToggled { enabled: bool },

    /// The user left. Begins teardown.
    Leave,

    /// Teardown after `Leave` completed.
    LeaveCompleted,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Connect the transport presenting `token`.
    Connect { attempt: u64, token: SecretString },

    /// Start the connect/ready timer for `attempt`.
    ArmConnectTimeout { attempt: u64 },

    /// Disconnect the transport.
    Disconnect,

    /// Record the final participant count of `room` in the directory.
    ReportLeave { room: String, participant_count: u32 },
}

/// Rejected inputs. State is untouched when these are returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    AlreadyInProgress,
    NotReadyToJoin,
}

impl From<Rejection> for BootstrapError {
    fn from(_: Rejection) -> Self {
        BootstrapError::AlreadyInProgress
    }
}

impl From<Rejection> for SessionError {
    fn from(_: Rejection) -> Self {
        SessionError::NotReadyToJoin
    }
}

/// Outcome of a leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveReport {
    /// Room that was left, if one had been joined.
    pub room: Option<String>,
    /// Participants in the room at leave time, including the local one.
    pub participant_count: u32,
}

/// Point-in-time view of a session for the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub room: Option<String>,
    pub participant_count: u32,
    pub layout: Layout,
    pub last_error: Option<SessionError>,
}

/// Owned session state. See the module docs for the transition diagram.
#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
    attempt: u64,
    room: Option<String>,
    identity: Option<String>,
    credential: Option<JoinCredential>,
    audio: Option<AudioSessionGuard>,
    grants: DeviceGrants,
    camera_enabled: bool,
    roster: Vec<ParticipantTrack>,
    last_error: Option<SessionError>,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            attempt: 0,
            room: None,
            identity: None,
            credential: None,
            audio: None,
            grants: DeviceGrants::default(),
            camera_enabled: true,
            roster: Vec::new(),
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Generation of the current attempt. Results tagged with an older
    /// generation are stale.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn holds_audio(&self) -> bool {
        self.audio.as_ref().is_some_and(AudioSessionGuard::is_acquired)
    }

    pub fn grants(&self) -> DeviceGrants {
        self.grants
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Participants including the local one.
    pub fn participant_count(&self) -> u32 {
        u32::try_from(self.roster.len()).unwrap_or(u32::MAX)
    }

    /// Tiles to render. Empty unless the session is `Ready`.
    pub fn layout(&self) -> Layout {
        if self.state == SessionState::Ready {
            arrange(&self.roster)
        } else {
            Layout::empty()
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            room: self.room.clone(),
            participant_count: self.participant_count(),
            layout: self.layout(),
            last_error: self.last_error.clone(),
        }
    }

    /// Apply one input and return the effects to perform.
    pub fn apply(&mut self, input: SessionInput) -> Result<Vec<Effect>, Rejection> {
        match input {
            SessionInput::BootstrapStarted { room, identity } => {
                self.on_bootstrap_started(room, identity)
            }
            SessionInput::PermissionsAcquired { attempt, grants } => {
                if attempt == self.attempt && self.state == SessionState::AcquiringPermissions {
                    self.grants = grants;
                    self.transition(SessionState::FetchingToken);
                }
                Ok(Vec::new())
            }
            SessionInput::BootstrapFinished { attempt, result } => {
                self.on_bootstrap_finished(attempt, result);
                Ok(Vec::new())
            }
            SessionInput::Join => self.on_join(),
            SessionInput::ConnectFinished { attempt, result } => {
                Ok(self.on_connect_finished(attempt, result))
            }
            SessionInput::ConnectTimedOut { attempt } => {
                if attempt == self.attempt
                    && matches!(
                        self.state,
                        SessionState::Connecting | SessionState::ConnectedAwaitingReady
                    )
                {
                    warn!(target: "room.session", "Timed out waiting for room to become ready");
                    self.fail(SessionError::ConnectTimeout);
                    return Ok(vec![Effect::Disconnect]);
                }
                Ok(Vec::new())
            }
            SessionInput::Media(event) => Ok(self.on_media_event(event)),
            SessionInput::CameraToggled { enabled } => {
                self.camera_enabled = enabled;
                let has_video = enabled && self.grants.camera;
                if let Some(identity) = self.identity.clone() {
                    if let Some(local) = self.find_mut(&identity) {
                        local.has_video = has_video;
                    }
                }
                Ok(Vec::new())
            }
            SessionInput::Leave => Ok(self.on_leave()),
            SessionInput::LeaveCompleted => {
                if self.state == SessionState::Leaving {
                    self.transition(SessionState::Idle);
                }
                Ok(Vec::new())
            }
        }
    }

    /// Final participant count for a leave from the current state.
    pub fn leave_report(&self) -> LeaveReport {
        LeaveReport {
            room: if matches!(
                self.state,
                SessionState::ConnectedAwaitingReady | SessionState::Ready
            ) {
                self.room.clone()
            } else {
                None
            },
            participant_count: self.participant_count(),
        }
    }

    fn on_bootstrap_started(
        &mut self,
        room: String,
        identity: String,
    ) -> Result<Vec<Effect>, Rejection> {
        if self.state.is_in_progress() {
            debug!(target: "room.session", state = %self.state, "Bootstrap rejected, attempt in progress");
            return Err(Rejection::AlreadyInProgress);
        }

        self.clear_session();
        self.attempt += 1;
        self.room = Some(room);
        self.identity = Some(identity);
        self.last_error = None;
        self.transition(SessionState::AcquiringPermissions);
        Ok(Vec::new())
    }

    fn on_bootstrap_finished(&mut self, attempt: u64, result: Result<Bootstrapped, BootstrapError>) {
        if attempt != self.attempt || !self.state.is_in_progress() {
            debug!(target: "room.session", attempt, "Discarding stale bootstrap result");
            return;
        }

        match result {
            Ok(bootstrapped) => {
                self.grants = bootstrapped.grants;
                self.credential = Some(bootstrapped.credential);
                self.audio = Some(bootstrapped.audio);
                // Awaiting join; the credential is held in FetchingToken.
                if self.state == SessionState::AcquiringPermissions {
                    self.transition(SessionState::FetchingToken);
                }
            }
            Err(e) => {
                warn!(target: "room.session", error = %e, "Session attempt failed before connecting");
                self.fail(SessionError::Bootstrap(e));
            }
        }
    }

    fn on_join(&mut self) -> Result<Vec<Effect>, Rejection> {
        if self.state != SessionState::FetchingToken {
            return Err(Rejection::NotReadyToJoin);
        }
        let Some(credential) = self.credential.as_ref() else {
            return Err(Rejection::NotReadyToJoin);
        };

        let token = credential.token.clone();
        self.transition(SessionState::Connecting);
        Ok(vec![
            Effect::ArmConnectTimeout {
                attempt: self.attempt,
            },
            Effect::Connect {
                attempt: self.attempt,
                token,
            },
        ])
    }

    fn on_connect_finished(
        &mut self,
        attempt: u64,
        result: Result<(), TransportError>,
    ) -> Vec<Effect> {
        if attempt != self.attempt || !self.state.holds_transport() {
            // The session ended while the connect was running.
            if result.is_ok() && !self.state.holds_transport() {
                debug!(target: "room.session", attempt, "Tearing down connection finished after session end");
                return vec![Effect::Disconnect];
            }
            return Vec::new();
        }

        match result {
            Ok(()) => {
                self.on_connected();
                Vec::new()
            }
            Err(e)
                if matches!(
                    self.state,
                    SessionState::Connecting | SessionState::ConnectedAwaitingReady
                ) =>
            {
                warn!(target: "room.session", error = %e, "Transport connect failed");
                self.fail(SessionError::ConnectFailed(e.to_string()));
                vec![Effect::Disconnect]
            }
            Err(e) => {
                warn!(target: "room.session", error = %e, "Ignoring connect failure reported after room ready");
                Vec::new()
            }
        }
    }

    fn on_connected(&mut self) {
        if self.state != SessionState::Connecting {
            return;
        }

        if let Some(identity) = self.identity.clone() {
            if self.find_mut(&identity).is_none() {
                let mut local = ParticipantTrack::new(identity.clone(), identity);
                local.has_video = self.grants.camera && self.camera_enabled;
                self.roster.insert(0, local);
            }
        }
        self.transition(SessionState::ConnectedAwaitingReady);
    }

    fn on_media_event(&mut self, event: MediaEvent) -> Vec<Effect> {
        if !self.state.holds_transport() {
            debug!(target: "room.session", state = %self.state, ?event, "Ignoring media event");
            return Vec::new();
        }

        match event {
            MediaEvent::Connected => self.on_connected(),
            MediaEvent::RoomReady => {
                // Ready implies connected, even if the connect call has not
                // returned yet.
                self.on_connected();
                if self.state == SessionState::ConnectedAwaitingReady {
                    self.transition(SessionState::Ready);
                }
            }
            MediaEvent::ParticipantJoined { identity, name } => {
                if self.find_mut(&identity).is_none() {
                    self.roster.push(ParticipantTrack::new(identity, name));
                }
            }
            MediaEvent::ParticipantLeft { identity } => {
                self.roster.retain(|p| p.participant_identity != identity);
            }
            MediaEvent::TrackPublished { identity } => {
                if let Some(participant) = self.find_mut(&identity) {
                    participant.has_video = true;
                }
            }
            MediaEvent::TrackUnpublished { identity } => {
                if let Some(participant) = self.find_mut(&identity) {
                    participant.has_video = false;
                }
            }
            MediaEvent::SpeakingChanged { speakers } => {
                for participant in &mut self.roster {
                    participant.is_speaking = speakers.contains(&participant.participant_identity);
                }
            }
            MediaEvent::Disconnected { reason } => {
                warn!(target: "room.session", reason = %reason, "Transport disconnected");
                self.fail(SessionError::TransportDisconnected(reason));
            }
        }

        Vec::new()
    }

    fn on_leave(&mut self) -> Vec<Effect> {
        let report = self.leave_report();
        let mut effects = Vec::new();

        if let Some(room) = report.room {
            effects.push(Effect::ReportLeave {
                room,
                participant_count: report.participant_count,
            });
        }
        if self.state.holds_transport() {
            effects.push(Effect::Disconnect);
        }

        // Invalidate any in-flight bootstrap or connect.
        self.attempt += 1;
        self.clear_session();
        self.transition(SessionState::Leaving);
        effects
    }

    fn fail(&mut self, error: SessionError) {
        self.clear_session();
        self.last_error = Some(error);
        self.transition(SessionState::Failed);
    }

    /// Drop the credential, the audio guard and the roster together.
    fn clear_session(&mut self) {
        self.credential = None;
        if let Some(audio) = self.audio.take() {
            audio.release();
        }
        self.roster.clear();
    }

    fn find_mut(&mut self, identity: &str) -> Option<&mut ParticipantTrack> {
        self.roster
            .iter_mut()
            .find(|p| p.participant_identity == identity)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!(target: "room.session", from = %self.state, to = %next, "Session state changed");
            self.state = next;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audio::AudioSession;
    use crate::errors::{AudioSessionError, ProviderError};
    use crate::layout::LayoutKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingAudio {
        active: AtomicUsize,
        released: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AudioSession for CountingAudio {
        async fn activate(&self) -> Result<(), AudioSessionError> {
            self.active.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn deactivate(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn credential(room: &str) -> JoinCredential {
        JoinCredential {
            token: SecretString::from("token"),
            room: room.to_string(),
            identity: "me".to_string(),
        }
    }

    async fn bootstrapped(audio: &Arc<CountingAudio>) -> Bootstrapped {
        Bootstrapped {
            credential: credential("abc"),
            audio: AudioSessionGuard::acquire(audio.clone()).await,
            grants: DeviceGrants::ALL,
        }
    }

    fn start(machine: &mut SessionMachine) -> u64 {
        machine
            .apply(SessionInput::BootstrapStarted {
                room: "abc".to_string(),
                identity: "me".to_string(),
            })
            .unwrap();
        machine.attempt()
    }

    async fn ready_machine(audio: &Arc<CountingAudio>) -> SessionMachine {
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);
        machine
            .apply(SessionInput::PermissionsAcquired {
                attempt,
                grants: DeviceGrants::ALL,
            })
            .unwrap();
        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Ok(bootstrapped(audio).await),
            })
            .unwrap();
        machine.apply(SessionInput::Join).unwrap();
        machine
            .apply(SessionInput::ConnectFinished {
                attempt,
                result: Ok(()),
            })
            .unwrap();
        machine
            .apply(SessionInput::Media(MediaEvent::RoomReady))
            .unwrap();
        assert_eq!(machine.state(), SessionState::Ready);
        machine
    }

    #[test]
    fn test_bootstrap_progresses_through_permissions() {
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);
        assert_eq!(machine.state(), SessionState::AcquiringPermissions);

        machine
            .apply(SessionInput::PermissionsAcquired {
                attempt,
                grants: DeviceGrants::default(),
            })
            .unwrap();
        assert_eq!(machine.state(), SessionState::FetchingToken);
    }

    #[test]
    fn test_bootstrap_while_in_progress_is_rejected_and_state_untouched() {
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);

        let result = machine.apply(SessionInput::BootstrapStarted {
            room: "other".to_string(),
            identity: "me".to_string(),
        });

        assert_eq!(result.unwrap_err(), Rejection::AlreadyInProgress);
        assert_eq!(machine.state(), SessionState::AcquiringPermissions);
        assert_eq!(machine.attempt(), attempt);
        assert_eq!(machine.room(), Some("abc"));
    }

    #[test]
    fn test_token_failure_fails_attempt() {
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);

        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Err(BootstrapError::TokenFetchFailed(ProviderError::Status(500))),
            })
            .unwrap();

        assert_eq!(machine.state(), SessionState::Failed);
        assert!(!machine.has_credential());
        assert_eq!(
            machine.last_error(),
            Some(&SessionError::Bootstrap(BootstrapError::TokenFetchFailed(
                ProviderError::Status(500)
            )))
        );
        assert_eq!(machine.snapshot().last_error, machine.last_error().cloned());
    }

    #[test]
    fn test_bootstrap_allowed_again_after_failure() {
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);
        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Err(BootstrapError::TokenFetchFailed(ProviderError::Timeout)),
            })
            .unwrap();

        let retry = start(&mut machine);
        assert!(retry > attempt);
        assert_eq!(machine.state(), SessionState::AcquiringPermissions);
    }

    #[test]
    fn test_join_without_credential_is_rejected() {
        let mut machine = SessionMachine::new();
        assert_eq!(
            machine.apply(SessionInput::Join).unwrap_err(),
            Rejection::NotReadyToJoin
        );

        start(&mut machine);
        assert_eq!(
            machine.apply(SessionInput::Join).unwrap_err(),
            Rejection::NotReadyToJoin
        );
    }

    #[tokio::test]
    async fn test_join_requests_connect_and_timer() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);
        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Ok(bootstrapped(&audio).await),
            })
            .unwrap();
        assert_eq!(machine.state(), SessionState::FetchingToken);
        assert!(machine.has_credential());

        let effects = machine.apply(SessionInput::Join).unwrap();

        assert_eq!(machine.state(), SessionState::Connecting);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Connect { attempt: a, .. } if *a == attempt)));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ArmConnectTimeout { .. })));
    }

    #[tokio::test]
    async fn test_ready_holds_credential_and_renders_local_tile() {
        let audio = Arc::new(CountingAudio::default());
        let machine = ready_machine(&audio).await;

        assert!(machine.has_credential());
        assert!(machine.holds_audio());
        assert_eq!(machine.participant_count(), 1);
        assert_eq!(machine.layout().kind, LayoutKind::Single);
    }

    #[tokio::test]
    async fn test_layout_empty_until_ready() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);
        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Ok(bootstrapped(&audio).await),
            })
            .unwrap();
        machine.apply(SessionInput::Join).unwrap();
        machine
            .apply(SessionInput::Media(MediaEvent::Connected))
            .unwrap();

        assert_eq!(machine.state(), SessionState::ConnectedAwaitingReady);
        assert_eq!(machine.participant_count(), 1);
        assert_eq!(machine.layout().kind, LayoutKind::Empty);
    }

    #[tokio::test]
    async fn test_roster_follows_media_events() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = ready_machine(&audio).await;

        for id in ["a", "b"] {
            machine
                .apply(SessionInput::Media(MediaEvent::ParticipantJoined {
                    identity: id.to_string(),
                    name: id.to_uppercase(),
                }))
                .unwrap();
        }
        machine
            .apply(SessionInput::Media(MediaEvent::TrackPublished {
                identity: "a".to_string(),
            }))
            .unwrap();
        machine
            .apply(SessionInput::Media(MediaEvent::SpeakingChanged {
                speakers: vec!["b".to_string()],
            }))
            .unwrap();

        let layout = machine.layout();
        assert_eq!(layout.kind, LayoutKind::Grid);
        assert_eq!(layout.tiles[0].identity, "me");
        assert!(layout.tiles[2].is_speaking);

        machine
            .apply(SessionInput::Media(MediaEvent::ParticipantLeft {
                identity: "a".to_string(),
            }))
            .unwrap();
        assert_eq!(machine.participant_count(), 2);
        assert_eq!(machine.layout().kind, LayoutKind::Pair);
    }

    #[tokio::test]
    async fn test_duplicate_join_event_is_ignored() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = ready_machine(&audio).await;

        for _ in 0..2 {
            machine
                .apply(SessionInput::Media(MediaEvent::ParticipantJoined {
                    identity: "a".to_string(),
                    name: "A".to_string(),
                }))
                .unwrap();
        }
        assert_eq!(machine.participant_count(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_fails_and_clears_everything() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = ready_machine(&audio).await;

        machine
            .apply(SessionInput::Media(MediaEvent::Disconnected {
                reason: "SERVER_SHUTDOWN".to_string(),
            }))
            .unwrap();

        assert_eq!(machine.state(), SessionState::Failed);
        assert!(!machine.has_credential());
        assert!(!machine.holds_audio());
        assert_eq!(audio.released.load(Ordering::SeqCst), 1);
        assert_eq!(
            machine.last_error(),
            Some(&SessionError::TransportDisconnected(
                "SERVER_SHUTDOWN".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_leave_from_ready_reports_count_and_releases_audio() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = ready_machine(&audio).await;
        for i in 0..5 {
            machine
                .apply(SessionInput::Media(MediaEvent::ParticipantJoined {
                    identity: format!("remote-{i}"),
                    name: String::new(),
                }))
                .unwrap();
        }

        let effects = machine.apply(SessionInput::Leave).unwrap();

        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::ReportLeave { room, participant_count: 6 } if room == "abc"
        )));
        assert!(effects.iter().any(|e| matches!(e, Effect::Disconnect)));
        assert_eq!(machine.state(), SessionState::Leaving);
        assert_eq!(audio.released.load(Ordering::SeqCst), 1);

        machine.apply(SessionInput::LeaveCompleted).unwrap();
        assert_eq!(machine.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_leave_while_fetching_discards_late_result() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);

        let effects = machine.apply(SessionInput::Leave).unwrap();
        assert!(effects.is_empty());
        machine.apply(SessionInput::LeaveCompleted).unwrap();
        assert_eq!(machine.state(), SessionState::Idle);

        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Ok(bootstrapped(&audio).await),
            })
            .unwrap();

        assert_eq!(machine.state(), SessionState::Idle);
        assert!(!machine.has_credential());
        assert_eq!(audio.active.load(Ordering::SeqCst), 1);
        assert_eq!(audio.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_timeout_fails_and_disconnects() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);
        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Ok(bootstrapped(&audio).await),
            })
            .unwrap();
        machine.apply(SessionInput::Join).unwrap();

        let effects = machine
            .apply(SessionInput::ConnectTimedOut { attempt })
            .unwrap();

        assert!(matches!(effects.as_slice(), [Effect::Disconnect]));
        assert_eq!(machine.state(), SessionState::Failed);
        assert_eq!(machine.last_error(), Some(&SessionError::ConnectTimeout));
    }

    #[tokio::test]
    async fn test_timeout_after_ready_is_ignored() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = ready_machine(&audio).await;
        let attempt = machine.attempt();

        let effects = machine
            .apply(SessionInput::ConnectTimedOut { attempt })
            .unwrap();

        assert!(effects.is_empty());
        assert_eq!(machine.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_connect_failure_fails_attempt() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);
        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Ok(bootstrapped(&audio).await),
            })
            .unwrap();
        machine.apply(SessionInput::Join).unwrap();

        machine
            .apply(SessionInput::ConnectFinished {
                attempt,
                result: Err(TransportError::ConnectFailed("refused".to_string())),
            })
            .unwrap();

        assert_eq!(machine.state(), SessionState::Failed);
        assert_eq!(audio.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_after_connected_event_fails_attempt() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);
        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Ok(bootstrapped(&audio).await),
            })
            .unwrap();
        machine.apply(SessionInput::Join).unwrap();
        machine
            .apply(SessionInput::Media(MediaEvent::Connected))
            .unwrap();
        assert_eq!(machine.state(), SessionState::ConnectedAwaitingReady);

        let effects = machine
            .apply(SessionInput::ConnectFinished {
                attempt,
                result: Err(TransportError::ConnectFailed("refused".to_string())),
            })
            .unwrap();

        assert!(matches!(effects.as_slice(), [Effect::Disconnect]));
        assert_eq!(machine.state(), SessionState::Failed);
        assert_eq!(
            machine.last_error(),
            Some(&SessionError::ConnectFailed(
                "Connect failed: refused".to_string()
            ))
        );
        assert_eq!(audio.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_finishing_after_leave_is_torn_down() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);
        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Ok(bootstrapped(&audio).await),
            })
            .unwrap();
        machine.apply(SessionInput::Join).unwrap();
        machine.apply(SessionInput::Leave).unwrap();
        machine.apply(SessionInput::LeaveCompleted).unwrap();

        let effects = machine
            .apply(SessionInput::ConnectFinished {
                attempt,
                result: Ok(()),
            })
            .unwrap();

        assert!(matches!(effects.as_slice(), [Effect::Disconnect]));
        assert_eq!(machine.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_connect_finishing_after_timeout_is_torn_down() {
        let audio = Arc::new(CountingAudio::default());
        let mut machine = SessionMachine::new();
        let attempt = start(&mut machine);
        machine
            .apply(SessionInput::BootstrapFinished {
                attempt,
                result: Ok(bootstrapped(&audio).await),
            })
            .unwrap();
        machine.apply(SessionInput::Join).unwrap();
        machine
            .apply(SessionInput::ConnectTimedOut { attempt })
            .unwrap();

        let late_ok = machine
            .apply(SessionInput::ConnectFinished {
                attempt,
                result: Ok(()),
            })
            .unwrap();
        assert!(matches!(late_ok.as_slice(), [Effect::Disconnect]));
        assert_eq!(machine.state(), SessionState::Failed);
        assert_eq!(machine.last_error(), Some(&SessionError::ConnectTimeout));

        let late_err = machine
            .apply(SessionInput::ConnectFinished {
                attempt,
                result: Err(TransportError::ConnectFailed("late".to_string())),
            })
            .unwrap();
        assert!(late_err.is_empty());
    }

    #[test]
    fn test_media_events_ignored_when_idle() {
        let mut machine = SessionMachine::new();
        machine
            .apply(SessionInput::Media(MediaEvent::Disconnected {
                reason: "late".to_string(),
            }))
            .unwrap();
        assert_eq!(machine.state(), SessionState::Idle);
    }

    #[test]
    fn test_leave_from_idle_is_noop() {
        let mut machine = SessionMachine::new();
        let effects = machine.apply(SessionInput::Leave).unwrap();
        machine.apply(SessionInput::LeaveCompleted).unwrap();

        assert!(effects.is_empty());
        assert_eq!(machine.state(), SessionState::Idle);
    }
}
