//! `/listRooms` integration tests.

use common::types::{ListRoomsResponse, RoomSummary};
use ts_test_utils::TestTokenServer;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIST_ROOMS_RPC: &str = "/twirp/livekit.RoomService/ListRooms";

#[tokio::test]
async fn test_list_rooms_returns_rooms() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_with_rooms(vec![
        RoomSummary::new("abc", 3),
        RoomSummary::new("quiet", 0),
    ])
    .await?;

    let response = reqwest::get(format!("{}/listRooms", server.url())).await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(
        body,
        serde_json::json!({
            "rooms": [
                { "name": "abc", "numParticipants": 3 },
                { "name": "quiet", "numParticipants": 0 }
            ]
        })
    );

    Ok(())
}

#[tokio::test]
async fn test_list_rooms_empty() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let body: ListRoomsResponse = reqwest::get(format!("{}/listRooms", server.url()))
        .await?
        .json()
        .await?;

    assert!(body.rooms.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_list_rooms_failure_returns_500_with_message() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_failing_rooms().await?;

    let response = reqwest::get(format!("{}/listRooms", server.url())).await?;
    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, serde_json::json!({ "error": "Failed to fetch rooms" }));

    Ok(())
}

#[tokio::test]
async fn test_list_rooms_through_media_room_api() -> Result<(), anyhow::Error> {
    let media = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LIST_ROOMS_RPC))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rooms": [
                { "sid": "RM_abc", "name": "abc", "num_participants": 6 },
                { "sid": "RM_new", "name": "fresh" }
            ]
        })))
        .expect(1)
        .mount(&media)
        .await;

    let server = TestTokenServer::spawn_with_media_url(&media.uri()).await?;

    let body: ListRoomsResponse = reqwest::get(format!("{}/listRooms", server.url()))
        .await?
        .json()
        .await?;

    assert_eq!(
        body.rooms,
        vec![RoomSummary::new("abc", 6), RoomSummary::new("fresh", 0)]
    );

    Ok(())
}

#[tokio::test]
async fn test_media_room_api_error_returns_500() -> Result<(), anyhow::Error> {
    let media = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LIST_ROOMS_RPC))
        .respond_with(ResponseTemplate::new(500))
        .mount(&media)
        .await;

    let server = TestTokenServer::spawn_with_media_url(&media.uri()).await?;

    let response = reqwest::get(format!("{}/listRooms", server.url())).await?;
    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"], "Failed to fetch rooms");

    Ok(())
}
