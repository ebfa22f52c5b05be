//! Scripted token provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use room_test_utils::MockTokenProvider;
//!
//! let tokens = MockTokenProvider::new()
//!     .with_rooms(vec![RoomSummary::new("abc", 3)]);
//!
//! // Make the next directory refresh fail
//! tokens.fail_list_rooms(ProviderError::Status(500));
//! ```

use common::secret::SecretString;
use common::types::RoomSummary;
use room_client::errors::ProviderError;
use room_client::token_provider::{JoinCredential, TokenProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Token provider answering from in-memory state.
#[derive(Debug, Default)]
pub struct MockTokenProvider {
    rooms: Mutex<Vec<RoomSummary>>,
    list_error: Mutex<Option<ProviderError>>,
    token_error: Mutex<Option<ProviderError>>,
    token_delay: Mutex<Option<Duration>>,
    requests: Mutex<Vec<(String, String)>>,
    list_calls: AtomicUsize,
}

impl MockTokenProvider {
    /// A provider issuing tokens for any request and listing no rooms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `rooms` listed.
    #[must_use]
    pub fn with_rooms(self, rooms: Vec<RoomSummary>) -> Self {
        self.set_rooms(rooms);
        self
    }

    /// Fail every token request with `error`.
    #[must_use]
    pub fn failing_tokens(self, error: ProviderError) -> Self {
        *self.token_error.lock().unwrap() = Some(error);
        self
    }

    /// Delay every token response by `delay`.
    #[must_use]
    pub fn with_token_delay(self, delay: Duration) -> Self {
        *self.token_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Replace the listed rooms and clear any listing failure.
    pub fn set_rooms(&self, rooms: Vec<RoomSummary>) {
        *self.rooms.lock().unwrap() = rooms;
        *self.list_error.lock().unwrap() = None;
    }

    /// Fail room listing with `error` until [`set_rooms`] is called.
    ///
    /// [`set_rooms`]: MockTokenProvider::set_rooms
    pub fn fail_list_rooms(&self, error: ProviderError) {
        *self.list_error.lock().unwrap() = Some(error);
    }

    /// (room, identity) pairs requested so far.
    #[must_use]
    pub fn token_requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenProvider for MockTokenProvider {
    async fn fetch_token(
        &self,
        room: &str,
        identity: &str,
    ) -> Result<JoinCredential, ProviderError> {
        self.requests
            .lock()
            .unwrap()
            .push((room.to_string(), identity.to_string()));

        let delay = *self.token_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.token_error.lock().unwrap().clone() {
            return Err(error);
        }

        Ok(JoinCredential {
            token: SecretString::from(format!("mock-token-{room}-{identity}")),
            room: room.to_string(),
            identity: identity.to_string(),
        })
    }

    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.list_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.rooms.lock().unwrap().clone())
    }
}
