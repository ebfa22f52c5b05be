//! Token server error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Bodies
//! have the shape `{ "error": "<message>" }` that existing clients read.
//! Messages are generic; the underlying cause is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::types::ErrorBody;
use thiserror::Error;

/// Client message for room listing failures.
pub const ROOM_LIST_FAILED_MESSAGE: &str = "Failed to fetch rooms";

/// Client message for token minting failures.
pub const TOKEN_GENERATION_FAILED_MESSAGE: &str = "Exception during token generation";

/// Token server error type.
///
/// Maps to HTTP status codes:
/// - BadRequest: 400 Bad Request
/// - RoomService, TokenGeneration, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum TsError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Room service error: {0}")]
    RoomService(String),

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Internal server error")]
    Internal,
}

impl TsError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            TsError::BadRequest(_) => 400,
            TsError::RoomService(_) | TsError::TokenGeneration(_) | TsError::Internal => 500,
        }
    }

    /// Message safe to return to clients.
    pub fn client_message(&self) -> String {
        match self {
            TsError::BadRequest(reason) => reason.clone(),
            TsError::RoomService(_) => ROOM_LIST_FAILED_MESSAGE.to_string(),
            TsError::TokenGeneration(_) => TOKEN_GENERATION_FAILED_MESSAGE.to_string(),
            TsError::Internal => "An internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for TsError {
    fn into_response(self) -> Response {
        let status = match &self {
            TsError::BadRequest(reason) => {
                tracing::debug!(target: "ts.errors", reason = %reason, "Rejected request");
                StatusCode::BAD_REQUEST
            }
            TsError::RoomService(err) => {
                tracing::error!(target: "ts.errors", error = %err, "Room listing failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            TsError::TokenGeneration(err) => {
                tracing::error!(target: "ts.errors", error = %err, "Token generation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            TsError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: self.client_message(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<common::jwt::JwtError> for TsError {
    fn from(err: common::jwt::JwtError) -> Self {
        TsError::TokenGeneration(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(TsError::BadRequest("x".to_string()).status_code(), 400);
        assert_eq!(TsError::RoomService("x".to_string()).status_code(), 500);
        assert_eq!(TsError::TokenGeneration("x".to_string()).status_code(), 500);
        assert_eq!(TsError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_room_service_error_hides_cause() {
        let response =
            TsError::RoomService("connection refused to 10.0.0.5:7880".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body, serde_json::json!({ "error": "Failed to fetch rooms" }));
    }

    #[tokio::test]
    async fn test_token_generation_error_hides_cause() {
        let response = TsError::TokenGeneration("InvalidKeyFormat".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(
            body,
            serde_json::json!({ "error": "Exception during token generation" })
        );
    }

    #[tokio::test]
    async fn test_bad_request_returns_reason() {
        let response =
            TsError::BadRequest("room must be at most 128 characters".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "room must be at most 128 characters");
    }

    #[test]
    fn test_jwt_error_converts_to_token_generation() {
        let err: TsError = common::jwt::JwtError::Signing("bad key".to_string()).into();
        assert!(matches!(err, TsError::TokenGeneration(_)));
    }
}
