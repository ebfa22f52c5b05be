//! Room directory cache and its background poller.
//!
//! [`RoomDirectory`] is the local snapshot of active rooms. It is replaced
//! wholesale on every successful fetch and is never emptied by a failed
//! one. [`RoomDirectoryPoller`] refreshes it on a fixed interval, starting
//! immediately, independently of any room session.

use crate::errors::DirectoryError;
use crate::token_provider::TokenProvider;
use common::types::RoomSummary;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Point-in-time contents of the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    /// Rooms from the last successful fetch, plus local leave updates.
    pub rooms: Vec<RoomSummary>,

    /// False until the first fetch attempt completes, successful or not.
    pub loaded: bool,
}

/// Shared local cache of the room list.
///
/// Cloning is cheap; all clones observe the same cache.
#[derive(Debug, Clone)]
pub struct RoomDirectory {
    inner: Arc<watch::Sender<DirectorySnapshot>>,
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomDirectory {
    /// An empty, not yet loaded directory.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(DirectorySnapshot::default());
        Self {
            inner: Arc::new(sender),
        }
    }

    pub fn snapshot(&self) -> DirectorySnapshot {
        self.inner.borrow().clone()
    }

    pub fn rooms(&self) -> Vec<RoomSummary> {
        self.inner.borrow().rooms.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.borrow().loaded
    }

    /// Participant count of `room`, if the directory has seen it.
    pub fn participant_count(&self, room: &str) -> Option<u32> {
        self.inner
            .borrow()
            .rooms
            .iter()
            .find(|r| r.name == room)
            .map(|r| r.num_participants)
    }

    /// Watch for changes.
    pub fn subscribe(&self) -> watch::Receiver<DirectorySnapshot> {
        self.inner.subscribe()
    }

    /// Replace the cache with a fresh fetch result.
    pub fn replace(&self, rooms: Vec<RoomSummary>) {
        self.inner.send_modify(|snapshot| {
            snapshot.rooms = rooms;
            snapshot.loaded = true;
        });
    }

    /// Record a failed fetch. The cached rooms are kept.
    pub fn mark_failed(&self) {
        self.inner.send_if_modified(|snapshot| {
            let changed = !snapshot.loaded;
            snapshot.loaded = true;
            changed
        });
    }

    /// Set `room`'s count to what the session saw when leaving it.
    ///
    /// Inserts the room if the cache has not seen it yet.
    pub fn record_leave(&self, room: &str, participant_count: u32) {
        self.inner.send_modify(|snapshot| {
            match snapshot.rooms.iter_mut().find(|r| r.name == room) {
                Some(existing) => existing.num_participants = participant_count,
                None => snapshot
                    .rooms
                    .push(RoomSummary::new(room, participant_count)),
            }
        });
        debug!(target: "room.directory", room = %room, participant_count, "Recorded leave count");
    }
}

/// Fetch once and merge the result into `directory`.
pub async fn refresh_once(
    provider: &dyn TokenProvider,
    directory: &RoomDirectory,
) -> Result<usize, DirectoryError> {
    match provider.list_rooms().await {
        Ok(rooms) => {
            let count = rooms.len();
            directory.replace(rooms);
            Ok(count)
        }
        Err(e) => {
            directory.mark_failed();
            Err(DirectoryError::FetchFailed(e))
        }
    }
}

/// Handle to a running poller.
#[derive(Debug)]
pub struct PollerHandle {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop polling and wait for the task to exit.
    pub async fn stop(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.task.await {
            warn!(target: "room.directory", error = %e, "Room directory poller task failed");
        }
    }

    /// Whether the poll loop is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Periodic room list refresh.
pub struct RoomDirectoryPoller;

impl RoomDirectoryPoller {
    /// Spawn the poll loop. The first fetch happens immediately.
    pub fn start(
        provider: Arc<dyn TokenProvider>,
        directory: RoomDirectory,
        interval: Duration,
    ) -> PollerHandle {
        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(run_poller(
            provider,
            directory,
            interval,
            cancel_token.clone(),
        ));

        PollerHandle { cancel_token, task }
    }
}

#[instrument(skip_all, name = "room.directory.poller")]
async fn run_poller(
    provider: Arc<dyn TokenProvider>,
    directory: RoomDirectory,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "room.directory",
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        "Starting room directory poller"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match refresh_once(provider.as_ref(), &directory).await {
                    Ok(count) => {
                        debug!(target: "room.directory", rooms = count, "Room list refreshed");
                    }
                    Err(e) => {
                        // Keep the previous cache and try again next tick.
                        warn!(
                            target: "room.directory",
                            error = %e,
                            "Room list refresh failed"
                        );
                    }
                }
            }
            () = cancel_token.cancelled() => {
                break;
            }
        }
    }

    info!(target: "room.directory", "Room directory poller stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::token_provider::JoinCredential;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers `list_rooms` from a script; the last answer repeats.
    struct Scripted {
        answers: Mutex<VecDeque<Result<Vec<RoomSummary>, ProviderError>>>,
    }

    impl Scripted {
        fn new(answers: Vec<Result<Vec<RoomSummary>, ProviderError>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
            }
        }
    }

    #[async_trait::async_trait]
    impl TokenProvider for Scripted {
        async fn fetch_token(
            &self,
            _room: &str,
            _identity: &str,
        ) -> Result<JoinCredential, ProviderError> {
            Err(ProviderError::MissingToken)
        }

        async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ProviderError> {
            let mut answers = self.answers.lock().unwrap();
            if answers.len() > 1 {
                answers.pop_front().unwrap()
            } else {
                answers.front().cloned().unwrap()
            }
        }
    }

    #[test]
    fn test_new_directory_is_empty_and_unloaded() {
        let directory = RoomDirectory::new();
        assert!(directory.rooms().is_empty());
        assert!(!directory.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cache() {
        let directory = RoomDirectory::new();
        let provider = Scripted::new(vec![
            Ok(vec![RoomSummary::new("abc", 3)]),
            Err(ProviderError::Status(500)),
        ]);

        refresh_once(&provider, &directory).await.unwrap();
        let err = refresh_once(&provider, &directory).await.unwrap_err();

        assert_eq!(err, DirectoryError::FetchFailed(ProviderError::Status(500)));
        assert_eq!(directory.rooms(), vec![RoomSummary::new("abc", 3)]);
    }

    #[tokio::test]
    async fn test_failed_first_refresh_marks_loaded() {
        let directory = RoomDirectory::new();
        let provider = Scripted::new(vec![Err(ProviderError::Timeout)]);

        assert!(refresh_once(&provider, &directory).await.is_err());
        assert!(directory.is_loaded());
        assert!(directory.rooms().is_empty());
    }

    #[tokio::test]
    async fn test_success_replaces_wholesale() {
        let directory = RoomDirectory::new();
        directory.replace(vec![RoomSummary::new("old", 1)]);
        let provider = Scripted::new(vec![Ok(vec![RoomSummary::new("new", 2)])]);

        refresh_once(&provider, &directory).await.unwrap();

        assert_eq!(directory.rooms(), vec![RoomSummary::new("new", 2)]);
    }

    #[test]
    fn test_record_leave_updates_existing_room() {
        let directory = RoomDirectory::new();
        directory.replace(vec![RoomSummary::new("abc", 3), RoomSummary::new("xyz", 1)]);

        directory.record_leave("abc", 6);

        assert_eq!(directory.participant_count("abc"), Some(6));
        assert_eq!(directory.participant_count("xyz"), Some(1));
    }

    #[test]
    fn test_record_leave_inserts_unknown_room() {
        let directory = RoomDirectory::new();
        directory.record_leave("fresh", 1);
        assert_eq!(directory.rooms(), vec![RoomSummary::new("fresh", 1)]);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let directory = RoomDirectory::new();
        let mut rx = directory.subscribe();

        directory.replace(vec![RoomSummary::new("abc", 3)]);

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().rooms.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_fetches_immediately_and_survives_failures() {
        let directory = RoomDirectory::new();
        let provider = Arc::new(Scripted::new(vec![
            Ok(vec![RoomSummary::new("abc", 3)]),
            Err(ProviderError::Status(502)),
        ]));
        let mut rx = directory.subscribe();

        let handle =
            RoomDirectoryPoller::start(provider, directory.clone(), Duration::from_millis(3000));

        rx.wait_for(|s| s.loaded).await.unwrap();
        assert_eq!(directory.rooms(), vec![RoomSummary::new("abc", 3)]);

        tokio::time::sleep(Duration::from_millis(3000 * 3 + 10)).await;

        assert!(handle.is_running());
        assert_eq!(directory.rooms(), vec![RoomSummary::new("abc", 3)]);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_poll_loop() {
        let directory = RoomDirectory::new();
        let provider = Arc::new(Scripted::new(vec![Ok(Vec::new())]));

        let handle = RoomDirectoryPoller::start(provider, directory, Duration::from_millis(500));
        handle.stop().await;
    }
}
