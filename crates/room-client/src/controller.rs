//! `SessionController` - single-owner actor for one room session.
//!
//! User commands, media events and the results of spawned work (token
//! fetch, transport connect, timers) all arrive as messages and go through
//! [`SessionMachine::apply`]. Nothing outside the actor task mutates session
//! state. Every change is published as a [`SessionSnapshot`] on a watch
//! channel.
//!
//! # Lifecycle
//!
//! 1. `bootstrap` runs permissions, token fetch and audio activation in a
//!    spawned task tagged with the attempt generation
//! 2. `join` connects the transport and arms the connect/ready timer
//! 3. `leave` records the final participant count, disconnects and returns
//!    to `Idle` from any state
//! 4. `shutdown` (or dropping every handle) tears down and stops the task

use crate::audio::AudioSession;
use crate::bootstrap::{resolve_target, Bootstrapped, SessionBootstrapper};
use crate::config::ClientConfig;
use crate::directory::RoomDirectory;
use crate::errors::{BootstrapError, SessionError, TransportError};
use crate::layout::Layout;
use crate::permissions::{Capability, DevicePermissions};
use crate::state::{
    Effect, LeaveReport, SessionInput, SessionMachine, SessionSnapshot, SessionState,
};
use crate::token_provider::TokenProvider;
use crate::transport::{MediaEventReceiver, MediaTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Channel buffer size for the controller mailbox.
const CONTROLLER_CHANNEL_BUFFER: usize = 32;

/// Channel buffer size for results of spawned work.
const INTERNAL_CHANNEL_BUFFER: usize = 16;

/// Room and identity a bootstrap resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub room: String,
    pub identity: String,
}

/// Collaborators a controller drives.
#[derive(Clone)]
pub struct SessionDeps {
    pub permissions: Arc<dyn DevicePermissions>,
    pub tokens: Arc<dyn TokenProvider>,
    pub audio: Arc<dyn AudioSession>,
    pub transport: Arc<dyn MediaTransport>,
    pub directory: RoomDirectory,
}

/// Commands from a [`ControllerHandle`].
#[derive(Debug)]
enum ControllerMessage {
    Bootstrap {
        room: String,
        identity: String,
        respond_to: oneshot::Sender<Result<SessionTarget, BootstrapError>>,
    },
    Join {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    Leave {
        respond_to: oneshot::Sender<LeaveReport>,
    },
    SetCamera {
        enabled: bool,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    SetMicrophone {
        enabled: bool,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
}

/// Handle to a running [`SessionController`].
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    sender: mpsc::Sender<ControllerMessage>,
    snapshot: watch::Receiver<SessionSnapshot>,
    cancel_token: CancellationToken,
}

impl ControllerHandle {
    /// Start a session attempt for `room` as `identity`.
    ///
    /// Empty strings select the default room and a generated guest
    /// identity. Resolves once the credential is held and the audio session
    /// is active; the session then waits in `FetchingToken` for [`join`].
    ///
    /// [`join`]: ControllerHandle::join
    pub async fn bootstrap(
        &self,
        room: &str,
        identity: &str,
    ) -> Result<SessionTarget, BootstrapError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControllerMessage::Bootstrap {
                room: room.to_string(),
                identity: identity.to_string(),
                respond_to: tx,
            })
            .await
            .map_err(|_| BootstrapError::ControllerStopped)?;

        rx.await.map_err(|_| BootstrapError::ControllerStopped)?
    }

    /// Connect to the bootstrapped room.
    ///
    /// Returns once the connect has started; watch [`subscribe`] for
    /// `Ready` or `Failed`.
    ///
    /// [`subscribe`]: ControllerHandle::subscribe
    pub async fn join(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControllerMessage::Join { respond_to: tx })
            .await
            .map_err(|_| SessionError::ControllerStopped)?;

        rx.await.map_err(|_| SessionError::ControllerStopped)?
    }

    /// Leave from whatever state the session is in. Idempotent.
    pub async fn leave(&self) -> Result<LeaveReport, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControllerMessage::Leave { respond_to: tx })
            .await
            .map_err(|_| SessionError::ControllerStopped)?;

        rx.await.map_err(|_| SessionError::ControllerStopped)
    }

    pub async fn set_camera_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControllerMessage::SetCamera {
                enabled,
                respond_to: tx,
            })
            .await
            .map_err(|_| SessionError::ControllerStopped)?;

        rx.await.map_err(|_| SessionError::ControllerStopped)?
    }

    pub async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControllerMessage::SetMicrophone {
                enabled,
                respond_to: tx,
            })
            .await
            .map_err(|_| SessionError::ControllerStopped)?;

        rx.await.map_err(|_| SessionError::ControllerStopped)?
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.snapshot.borrow().layout.clone()
    }

    /// Participants including the local one.
    #[must_use]
    pub fn participant_count(&self) -> u32 {
        self.snapshot.borrow().participant_count
    }

    /// Watch every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Tear the session down and stop the actor.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// Pending bootstrap caller, tagged with its attempt.
struct PendingBootstrap {
    attempt: u64,
    /// Cancels the spawned pre-connect work.
    cancel_token: CancellationToken,
    target: SessionTarget,
    respond_to: oneshot::Sender<Result<SessionTarget, BootstrapError>>,
}

/// The `SessionController` actor.
pub struct SessionController {
    machine: SessionMachine,
    bootstrapper: SessionBootstrapper,
    transport: Arc<dyn MediaTransport>,
    directory: RoomDirectory,
    media_url: String,
    connect_timeout: Duration,
    receiver: mpsc::Receiver<ControllerMessage>,
    media_events: MediaEventReceiver,
    media_open: bool,
    /// Results of spawned work, fed back into the machine.
    internal_tx: mpsc::Sender<SessionInput>,
    internal_rx: mpsc::Receiver<SessionInput>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    pending_bootstrap: Option<PendingBootstrap>,
    /// Cancels the connect call and connect timer of one attempt.
    connection: Option<(u64, CancellationToken)>,
    cancel_token: CancellationToken,
}

impl SessionController {
    /// Spawn a controller.
    ///
    /// `media_events` must be the receiving half of the channel the
    /// transport in `deps` sends on.
    pub fn spawn(
        config: &ClientConfig,
        deps: SessionDeps,
        media_events: MediaEventReceiver,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(CONTROLLER_CHANNEL_BUFFER);
        let (internal_tx, internal_rx) = mpsc::channel(INTERNAL_CHANNEL_BUFFER);
        let machine = SessionMachine::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());
        let cancel_token = CancellationToken::new();

        let bootstrapper = SessionBootstrapper::new(
            deps.permissions,
            deps.tokens,
            deps.audio,
            config.token_fetch_timeout,
        );

        let actor = Self {
            machine,
            bootstrapper,
            transport: deps.transport,
            directory: deps.directory,
            media_url: config.media_ws_url.clone(),
            connect_timeout: config.connect_timeout,
            receiver,
            media_events,
            media_open: true,
            internal_tx,
            internal_rx,
            snapshot_tx,
            pending_bootstrap: None,
            connection: None,
            cancel_token: cancel_token.clone(),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = ControllerHandle {
            sender,
            snapshot: snapshot_rx,
            cancel_token,
        };

        (handle, task_handle)
    }

    #[instrument(skip_all, name = "room.controller")]
    async fn run(mut self) {
        debug!(target: "room.controller", "SessionController started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(target: "room.controller", "SessionController received cancellation signal");
                    self.teardown().await;
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            debug!(target: "room.controller", "All handles dropped, exiting");
                            self.teardown().await;
                            break;
                        }
                    }
                }

                Some(input) = self.internal_rx.recv() => {
                    self.handle_internal(input).await;
                }

                event = self.media_events.recv(), if self.media_open => {
                    match event {
                        Some(event) => self.apply(SessionInput::Media(event)).await,
                        None => {
                            debug!(target: "room.controller", "Media event channel closed");
                            self.media_open = false;
                        }
                    }
                }
            }

            self.publish();
        }

        self.cancel_token.cancel();
        self.publish();
        info!(target: "room.controller", "SessionController stopped");
    }

    async fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::Bootstrap {
                room,
                identity,
                respond_to,
            } => self.handle_bootstrap(&room, &identity, respond_to),

            ControllerMessage::Join { respond_to } => {
                let result = match self.machine.apply(SessionInput::Join) {
                    Ok(effects) => {
                        self.run_effects(effects).await;
                        Ok(())
                    }
                    Err(rejection) => Err(rejection.into()),
                };
                self.publish();
                let _ = respond_to.send(result);
            }

            ControllerMessage::Leave { respond_to } => {
                let report = self.leave().await;
                self.publish();
                let _ = respond_to.send(report);
            }

            ControllerMessage::SetCamera {
                enabled,
                respond_to,
            } => {
                let result = self.set_track(Capability::Camera, enabled).await;
                self.publish();
                let _ = respond_to.send(result);
            }

            ControllerMessage::SetMicrophone {
                enabled,
                respond_to,
            } => {
                let result = self.set_track(Capability::Microphone, enabled).await;
                self.publish();
                let _ = respond_to.send(result);
            }
        }
    }

    fn handle_bootstrap(
        &mut self,
        room: &str,
        identity: &str,
        respond_to: oneshot::Sender<Result<SessionTarget, BootstrapError>>,
    ) {
        if self.machine.state().is_in_progress() {
            let _ = respond_to.send(Err(BootstrapError::AlreadyInProgress));
            return;
        }

        let (room, identity) = match resolve_target(room, identity) {
            Ok(target) => target,
            Err(e) => {
                let _ = respond_to.send(Err(e));
                return;
            }
        };

        if let Err(rejection) = self.machine.apply(SessionInput::BootstrapStarted {
            room: room.clone(),
            identity: identity.clone(),
        }) {
            let _ = respond_to.send(Err(rejection.into()));
            return;
        }

        let attempt = self.machine.attempt();
        let cancel_token = self.cancel_token.child_token();
        self.pending_bootstrap = Some(PendingBootstrap {
            attempt,
            cancel_token: cancel_token.clone(),
            target: SessionTarget {
                room: room.clone(),
                identity: identity.clone(),
            },
            respond_to,
        });

        info!(target: "room.controller", room = %room, attempt, "Session attempt started");

        let bootstrapper = self.bootstrapper.clone();
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let work = async {
                let grants = bootstrapper.acquire_permissions().await;
                let _ = internal_tx
                    .send(SessionInput::PermissionsAcquired {
                        attempt,
                        grants,
                    })
                    .await;

                let result = match bootstrapper.fetch_credential(&room, &identity).await {
                    Ok(credential) => Ok(Bootstrapped {
                        credential,
                        audio: bootstrapper.activate_audio().await,
                        grants,
                    }),
                    Err(e) => Err(e),
                };

                let _ = internal_tx
                    .send(SessionInput::BootstrapFinished {
                        attempt,
                        result,
                    })
                    .await;
            };

            tokio::select! {
                () = cancel_token.cancelled() => {}
                () = work => {}
            }
        });
    }

    async fn handle_internal(&mut self, input: SessionInput) {
        let finished = match &input {
            SessionInput::BootstrapFinished { attempt, result } => Some((
                *attempt,
                result.as_ref().map(|_| ()).map_err(BootstrapError::clone),
            )),
            _ => None,
        };

        self.apply(input).await;

        if let Some((attempt, outcome)) = finished {
            self.answer_bootstrap(attempt, outcome);
        }
    }

    fn answer_bootstrap(&mut self, attempt: u64, outcome: Result<(), BootstrapError>) {
        let Some(pending) = self.pending_bootstrap.take() else {
            return;
        };
        if pending.attempt != attempt {
            self.pending_bootstrap = Some(pending);
            return;
        }

        self.publish();
        let _ = pending.respond_to.send(outcome.map(|()| pending.target));
    }

    async fn leave(&mut self) -> LeaveReport {
        let report = self.machine.leave_report();

        match self.machine.apply(SessionInput::Leave) {
            Ok(effects) => self.run_effects(effects).await,
            Err(rejection) => {
                warn!(target: "room.controller", ?rejection, "Leave rejected");
            }
        }
        if let Some(pending) = self.pending_bootstrap.take() {
            pending.cancel_token.cancel();
            let _ = pending.respond_to.send(Err(BootstrapError::Cancelled));
        }
        self.publish();

        self.apply(SessionInput::LeaveCompleted).await;

        info!(
            target: "room.controller",
            room = report.room.as_deref().unwrap_or(""),
            participant_count = report.participant_count,
            "Left room"
        );
        report
    }

    async fn teardown(&mut self) {
        if self.machine.state() != SessionState::Idle {
            self.leave().await;
        }
    }

    async fn set_track(&mut self, capability: Capability, enabled: bool) -> Result<(), SessionError> {
        if self.machine.state().holds_transport() {
            if enabled && !self.machine.grants().allows(capability) {
                return Err(SessionError::Track(format!(
                    "{capability} permission not granted"
                )));
            }

            let result = match capability {
                Capability::Camera => self.transport.set_camera_enabled(enabled).await,
                Capability::Microphone => self.transport.set_microphone_enabled(enabled).await,
            };
            result.map_err(|e| {
                warn!(
                    target: "room.controller",
                    capability = %capability,
                    error = %e,
                    "Track toggle failed"
                );
                SessionError::Track(e.to_string())
            })?;
        }

        if capability == Capability::Camera {
            self.apply(SessionInput::CameraToggled { enabled }).await;
        }
        debug!(target: "room.controller", capability = %capability, enabled, "Track toggled");
        Ok(())
    }

    async fn apply(&mut self, input: SessionInput) {
        match self.machine.apply(input) {
            Ok(effects) => self.run_effects(effects).await,
            Err(rejection) => {
                debug!(target: "room.controller", ?rejection, "Input rejected");
            }
        }
    }

    /// Token for the connect work of `attempt`, replacing any older one.
    fn connection_token(&mut self, attempt: u64) -> CancellationToken {
        match &self.connection {
            Some((current, token)) if *current == attempt => token.clone(),
            _ => {
                let token = self.cancel_token.child_token();
                if let Some((_, previous)) = self.connection.replace((attempt, token.clone())) {
                    previous.cancel();
                }
                token
            }
        }
    }

    /// Abandon an in-flight connect once the session no longer owns the
    /// transport.
    fn release_connection(&mut self) {
        if self.machine.state().holds_transport() {
            return;
        }
        if let Some((attempt, token)) = self.connection.take() {
            debug!(target: "room.controller", attempt, "Cancelling connect work");
            token.cancel();
        }
    }

    async fn run_effects(&mut self, effects: Vec<Effect>) {
        self.release_connection();

        for effect in effects {
            match effect {
                Effect::Connect { attempt, token } => {
                    let transport = self.transport.clone();
                    let internal_tx = self.internal_tx.clone();
                    let url = self.media_url.clone();
                    let cancel_token = self.connection_token(attempt);
                    tokio::spawn(async move {
                        let connect = transport.connect(&url, &token);
                        let result: Result<(), TransportError> = tokio::select! {
                            () = cancel_token.cancelled() => return,
                            result = connect => result,
                        };
                        let _ = internal_tx
                            .send(SessionInput::ConnectFinished {
                                attempt,
                                result,
                            })
                            .await;
                    });
                }

                Effect::ArmConnectTimeout { attempt } => {
                    let internal_tx = self.internal_tx.clone();
                    let timeout = self.connect_timeout;
                    let cancel_token = self.connection_token(attempt);
                    tokio::spawn(async move {
                        tokio::select! {
                            () = cancel_token.cancelled() => {}
                            () = tokio::time::sleep(timeout) => {
                                let _ = internal_tx
                                    .send(SessionInput::ConnectTimedOut { attempt })
                                    .await;
                            }
                        }
                    });
                }

                Effect::Disconnect => {
                    self.transport.disconnect().await;
                }

                Effect::ReportLeave {
                    room,
                    participant_count,
                } => {
                    self.directory.record_leave(&room, participant_count);
                }
            }
        }
    }

    fn publish(&self) {
        let snapshot = self.machine.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
