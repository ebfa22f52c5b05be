//! Health and metrics endpoint integration tests.
//!
//! Uses the `TestTokenServer` harness.

use ts_test_utils::TestTokenServer;

/// Test that /health returns 200 and plain text "OK".
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// Test that /metrics serves Prometheus text after traffic.
#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_text() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let client = reqwest::Client::new();

    client
        .get(format!("{}/getToken", server.url()))
        .send()
        .await?;

    let response = client
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

/// Test that non-existent routes return 404.
#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/v1/nonexistent", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 404);

    Ok(())
}

/// Test that wrong methods are rejected.
#[tokio::test]
async fn test_post_to_get_token_returns_405() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/getToken", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 405);

    Ok(())
}

/// Test that responses carry a permissive CORS header for browser clients.
#[tokio::test]
async fn test_cors_allows_any_origin() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/listRooms", server.url()))
        .header("Origin", "http://localhost:19006")
        .send()
        .await?;

    let allow_origin = response
        .headers()
        .get("access-control-allow-origin")
        .and_then(|v| v.to_str().ok());
    assert_eq!(allow_origin, Some("*"));

    Ok(())
}
