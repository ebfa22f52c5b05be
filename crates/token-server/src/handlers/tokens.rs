//! Room token handler.

use crate::errors::TsError;
use crate::models::TokenQuery;
use crate::observability::metrics::record_token_issued;
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use common::jwt::VideoGrant;
use common::types::{generate_guest_identity, TokenResponse};
use std::sync::Arc;
use tracing::{info, instrument};

/// Handler for GET /getToken
///
/// Issues a room access token allowing the caller to join, publish and
/// subscribe in `room` as `user`.
///
/// # Query
///
/// - `room` - room name (default: "default-room")
/// - `user` - participant identity (default: `guest-` + 6 random `[a-z0-9]`)
///
/// # Response
///
/// ```json
/// { "token": "<jwt>" }
/// ```
#[instrument(skip_all, name = "ts.tokens.issue")]
pub async fn get_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, TsError> {
    query.validate().map_err(|e| {
        record_token_issued("rejected");
        TsError::BadRequest(e.to_string())
    })?;

    match issue_token(&state, &query) {
        Ok(response) => {
            record_token_issued("success");
            Ok(Json(response))
        }
        Err(e) => {
            record_token_issued("error");
            Err(e)
        }
    }
}

fn issue_token(state: &AppState, query: &TokenQuery) -> Result<TokenResponse, TsError> {
    let room = query.room_name();
    let identity = match query.identity() {
        Some(identity) => identity.to_string(),
        None => generate_guest_identity().map_err(|e| TsError::TokenGeneration(e.to_string()))?,
    };

    let token = state.signer.sign(
        &identity,
        Some(&identity),
        VideoGrant::join(room),
        state.config.token_ttl(),
    )?;

    info!(
        target: "ts.handlers.tokens",
        room = %room,
        guest = query.identity().is_none(),
        "Issued room token"
    );

    Ok(TokenResponse { token })
}
