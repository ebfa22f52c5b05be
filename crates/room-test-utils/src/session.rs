//! `TestSession` - a session controller wired to mock collaborators.
//!
//! # Example
//!
//! ```rust,ignore
//! use room_test_utils::*;
//!
//! let session = TestSession::builder()
//!     .with_permissions(StaticPermissions::denying())
//!     .build();
//!
//! session.handle.bootstrap("abc", "alice").await.unwrap();
//! ```

use crate::mock_devices::{RecordingAudioSession, StaticPermissions};
use crate::mock_tokens::MockTokenProvider;
use crate::mock_transport::{ConnectBehavior, MockMediaTransport};
use room_client::config::ClientConfig;
use room_client::{
    ControllerHandle, RoomDirectory, SessionController, SessionDeps, SessionSnapshot, SessionState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Media URL handed to the mock transport.
pub const TEST_MEDIA_URL: &str = "ws://media.test:7880";

/// Bound used by `wait_for_*` helpers.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// A running controller and the mocks behind it.
pub struct TestSession {
    pub handle: ControllerHandle,
    pub tokens: Arc<MockTokenProvider>,
    pub transport: Arc<MockMediaTransport>,
    pub audio: Arc<RecordingAudioSession>,
    pub directory: RoomDirectory,
    task: JoinHandle<()>,
}

impl TestSession {
    #[must_use]
    pub fn builder() -> TestSessionBuilder {
        TestSessionBuilder::default()
    }

    /// Wait until the published state is `state`.
    ///
    /// # Panics
    ///
    /// Panics if `state` is not reached within five seconds.
    pub async fn wait_for_state(&self, state: SessionState) -> SessionSnapshot {
        self.wait_for(|s| s.state == state).await
    }

    /// Wait until a published snapshot satisfies `predicate`.
    ///
    /// # Panics
    ///
    /// Panics on timeout or if the controller stops first.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut rx = self.handle.subscribe();
        let snapshot = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(predicate))
            .await
            .expect("timed out waiting for session snapshot")
            .expect("session controller stopped")
            .clone();
        snapshot
    }

    /// Bootstrap, join and wait for `Ready`.
    ///
    /// # Panics
    ///
    /// Panics if any step fails.
    pub async fn join_room(&self, room: &str, identity: &str) -> SessionSnapshot {
        self.handle
            .bootstrap(room, identity)
            .await
            .expect("bootstrap failed");
        self.handle.join().await.expect("join failed");
        self.wait_for_state(SessionState::Ready).await
    }

    /// Whether the controller task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TestSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Builder for [`TestSession`].
pub struct TestSessionBuilder {
    tokens: MockTokenProvider,
    permissions: StaticPermissions,
    audio: RecordingAudioSession,
    behavior: ConnectBehavior,
    directory: RoomDirectory,
    token_fetch_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl Default for TestSessionBuilder {
    fn default() -> Self {
        Self {
            tokens: MockTokenProvider::new(),
            permissions: StaticPermissions::granting(),
            audio: RecordingAudioSession::new(),
            behavior: ConnectBehavior::ConnectAndReady,
            directory: RoomDirectory::new(),
            token_fetch_timeout: None,
            connect_timeout: None,
        }
    }
}

impl TestSessionBuilder {
    #[must_use]
    pub fn with_tokens(mut self, tokens: MockTokenProvider) -> Self {
        self.tokens = tokens;
        self
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: StaticPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    #[must_use]
    pub fn with_audio(mut self, audio: RecordingAudioSession) -> Self {
        self.audio = audio;
        self
    }

    #[must_use]
    pub fn with_connect_behavior(mut self, behavior: ConnectBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Share a directory with the session (e.g. one a poller also feeds).
    #[must_use]
    pub fn with_directory(mut self, directory: RoomDirectory) -> Self {
        self.directory = directory;
        self
    }

    #[must_use]
    pub fn with_token_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.token_fetch_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Spawn the controller. Must be called inside a tokio runtime.
    #[must_use]
    pub fn build(self) -> TestSession {
        let mut config = ClientConfig::new("http://tokens.test", TEST_MEDIA_URL);
        if let Some(timeout) = self.token_fetch_timeout {
            config.token_fetch_timeout = timeout;
        }
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout = timeout;
        }

        let tokens = Arc::new(self.tokens);
        let audio = Arc::new(self.audio);
        let (transport, media_events) = MockMediaTransport::new(self.behavior);
        let transport = Arc::new(transport);

        let deps = SessionDeps {
            permissions: Arc::new(self.permissions),
            tokens: tokens.clone(),
            audio: audio.clone(),
            transport: transport.clone(),
            directory: self.directory.clone(),
        };
        let (handle, task) = SessionController::spawn(&config, deps, media_events);

        TestSession {
            handle,
            tokens,
            transport,
            audio,
            directory: self.directory,
            task,
        }
    }
}
