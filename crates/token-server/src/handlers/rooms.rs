//! Room listing handler.

use crate::errors::TsError;
use crate::observability::metrics::record_room_list_request;
use crate::routes::AppState;
use axum::{extract::State, Json};
use common::types::ListRoomsResponse;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Handler for GET /listRooms
///
/// # Response
///
/// ```json
/// { "rooms": [{ "name": "abc", "numParticipants": 3 }] }
/// ```
///
/// Room API failures return 500 `{ "error": "Failed to fetch rooms" }`.
#[instrument(skip_all, name = "ts.rooms.list")]
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListRoomsResponse>, TsError> {
    let start = Instant::now();

    match state.room_service.list_rooms().await {
        Ok(rooms) => {
            record_room_list_request("success", start.elapsed());
            debug!(target: "ts.handlers.rooms", room_count = rooms.len(), "Listed rooms");
            Ok(Json(ListRoomsResponse { rooms }))
        }
        Err(e) => {
            record_room_list_request("error", start.elapsed());
            Err(e)
        }
    }
}
