//! Media service room API client.
//!
//! Lists active rooms through the media service's Twirp endpoint
//! `POST {media_url}/twirp/livekit.RoomService/ListRooms`.
//!
//! # Security
//!
//! - Each call carries a short-lived service token with only the
//!   `roomList` grant
//! - Timeouts prevent hanging connections
//! - Failures are logged here; callers return a generic message

use crate::errors::TsError;
use common::jwt::AccessTokenSigner;
use common::types::RoomSummary;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Path of the room listing RPC.
const LIST_ROOMS_PATH: &str = "/twirp/livekit.RoomService/ListRooms";

/// Connect timeout for room API calls.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A room as returned by the room API.
#[derive(Debug, Clone, Deserialize)]
struct MediaRoom {
    name: String,

    #[serde(default, alias = "numParticipants")]
    num_participants: u32,
}

/// Body of the room listing RPC response.
#[derive(Debug, Clone, Default, Deserialize)]
struct MediaListRoomsResponse {
    #[serde(default)]
    rooms: Vec<MediaRoom>,
}

impl From<MediaRoom> for RoomSummary {
    fn from(room: MediaRoom) -> Self {
        RoomSummary::new(room.name, room.num_participants)
    }
}

/// Source of the active room list.
#[async_trait::async_trait]
pub trait RoomServiceTrait: Send + Sync {
    /// List active rooms with their participant counts.
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, TsError>;
}

/// HTTP client for the media service room API.
#[derive(Clone)]
pub struct RoomServiceClient {
    client: Client,
    base_url: String,
    signer: AccessTokenSigner,
}

impl RoomServiceClient {
    /// Create a room API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Media service base URL (e.g., "http://localhost:7880")
    /// * `signer` - Signs the service token sent with each call
    /// * `timeout` - Total request timeout
    ///
    /// # Errors
    ///
    /// Returns `TsError::Internal` if the HTTP client cannot be built.
    pub fn new(
        base_url: String,
        signer: AccessTokenSigner,
        timeout: Duration,
    ) -> Result<Self, TsError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| {
                error!(target: "ts.services.room_service", error = %e, "Failed to build HTTP client");
                TsError::Internal
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        })
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<Vec<RoomSummary>, TsError> {
        let status = response.status();

        if status.is_success() {
            let body: MediaListRoomsResponse = response.json().await.map_err(|e| {
                warn!(target: "ts.services.room_service", error = %e, "Failed to parse room list");
                TsError::RoomService(format!("Malformed room list: {e}"))
            })?;
            Ok(body.rooms.into_iter().map(RoomSummary::from).collect())
        } else if status.as_u16() == 401 {
            error!(target: "ts.services.room_service", "Service token rejected by media service");
            Err(TsError::RoomService(
                "Service token rejected by media service".to_string(),
            ))
        } else {
            warn!(target: "ts.services.room_service", status = %status, "Room API returned error");
            Err(TsError::RoomService(format!("Room API returned {status}")))
        }
    }
}

#[async_trait::async_trait]
impl RoomServiceTrait for RoomServiceClient {
    #[instrument(skip_all, name = "ts.room_service.list_rooms")]
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, TsError> {
        let service_token = self
            .signer
            .sign_room_list()
            .map_err(|e| TsError::RoomService(format!("Service token signing failed: {e}")))?;
        let url = format!("{}{}", self.base_url, LIST_ROOMS_PATH);

        let response = self
            .client
            .post(&url)
            .bearer_auth(service_token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| {
                warn!(target: "ts.services.room_service", error = %e, "Room API request failed");
                TsError::RoomService(format!("Room API unreachable: {e}"))
            })?;

        self.handle_response(response).await
    }
}

pub mod mock {
    //! In-memory room service for tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock room service returning a configurable room list.
    pub struct MockRoomService {
        rooms: Mutex<Vec<RoomSummary>>,
        return_error: bool,
        call_count: AtomicUsize,
    }

    impl MockRoomService {
        /// Create a mock that returns `rooms`.
        pub fn with_rooms(rooms: Vec<RoomSummary>) -> Self {
            Self {
                rooms: Mutex::new(rooms),
                return_error: false,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Create a mock with no active rooms.
        pub fn empty() -> Self {
            Self::with_rooms(Vec::new())
        }

        /// Create a mock that always fails.
        pub fn failing() -> Self {
            Self {
                rooms: Mutex::new(Vec::new()),
                return_error: true,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Replace the returned room list.
        pub fn set_rooms(&self, rooms: Vec<RoomSummary>) {
            if let Ok(mut guard) = self.rooms.lock() {
                *guard = rooms;
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl RoomServiceTrait for MockRoomService {
        async fn list_rooms(&self) -> Result<Vec<RoomSummary>, TsError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if self.return_error {
                return Err(TsError::RoomService(
                    "Mock room service error".to_string(),
                ));
            }

            self.rooms
                .lock()
                .map(|rooms| rooms.clone())
                .map_err(|_| TsError::Internal)
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_returns_rooms() {
            let mock = MockRoomService::with_rooms(vec![RoomSummary::new("abc", 3)]);
            let rooms = mock.list_rooms().await.unwrap();

            assert_eq!(rooms, vec![RoomSummary::new("abc", 3)]);
            assert_eq!(mock.call_count(), 1);
        }

        #[tokio::test]
        async fn test_mock_set_rooms_replaces_list() {
            let mock = MockRoomService::empty();
            mock.set_rooms(vec![RoomSummary::new("x", 1)]);

            assert_eq!(mock.list_rooms().await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_mock_failing() {
            let mock = MockRoomService::failing();
            assert!(matches!(
                mock.list_rooms().await,
                Err(TsError::RoomService(_))
            ));
            assert_eq!(mock.call_count(), 1);
        }
    }
}
