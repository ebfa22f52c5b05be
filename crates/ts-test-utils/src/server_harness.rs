//! Test server harness for E2E testing
//!
//! Provides `TestTokenServer` for spawning real token server instances in
//! tests, backed by either a mock room service or a real room API client
//! pointed at a stub media service.

use common::jwt::AccessTokenSigner;
use common::types::RoomSummary;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use token_server::config::Config;
use token_server::routes::{self, AppState};
use token_server::services::{MockRoomService, RoomServiceClient, RoomServiceTrait};

/// API key used by test servers.
pub const TEST_API_KEY: &str = "test-api-key";

/// API secret used by test servers.
pub const TEST_API_SECRET: &str = "test-api-secret-test-api-secret-00";

/// Metrics handle shared by every test server in the process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            routes::init_metrics_recorder().unwrap_or_else(|_| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle()
            })
        })
        .clone()
}

/// Build a test configuration, overriding defaults with `overrides`.
pub fn test_config(overrides: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
    let mut vars = HashMap::from([
        ("MEDIA_API_KEY".to_string(), TEST_API_KEY.to_string()),
        ("MEDIA_API_SECRET".to_string(), TEST_API_SECRET.to_string()),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    Config::from_vars(&vars).map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}

/// Test harness for spawning the token server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// let server = TestTokenServer::spawn_with_rooms(vec![RoomSummary::new("abc", 3)]).await?;
/// let body: serde_json::Value = reqwest::get(format!("{}/listRooms", server.url()))
///     .await?
///     .json()
///     .await?;
/// assert_eq!(body["rooms"][0]["numParticipants"], 3);
/// ```
pub struct TestTokenServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestTokenServer {
    /// Spawn a server with no active rooms.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_service(Arc::new(MockRoomService::empty())).await
    }

    /// Spawn a server whose room listing returns `rooms`.
    pub async fn spawn_with_rooms(rooms: Vec<RoomSummary>) -> Result<Self, anyhow::Error> {
        Self::spawn_with_service(Arc::new(MockRoomService::with_rooms(rooms))).await
    }

    /// Spawn a server whose room listing always fails.
    pub async fn spawn_failing_rooms() -> Result<Self, anyhow::Error> {
        Self::spawn_with_service(Arc::new(MockRoomService::failing())).await
    }

    /// Spawn a server using the real room API client against `media_url`
    /// (typically a `wiremock::MockServer`).
    pub async fn spawn_with_media_url(media_url: &str) -> Result<Self, anyhow::Error> {
        let config = test_config(&[("MEDIA_URL", media_url)])?;
        let room_service = RoomServiceClient::new(
            config.media_url.clone(),
            AccessTokenSigner::new(
                config.media_api_key.clone(),
                config.media_api_secret.clone(),
            ),
            config.room_service_timeout(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to create room service client: {}", e))?;

        Self::spawn_with(config, Arc::new(room_service)).await
    }

    /// Spawn a server with the given room service and default test config.
    pub async fn spawn_with_service(
        room_service: Arc<dyn RoomServiceTrait>,
    ) -> Result<Self, anyhow::Error> {
        Self::spawn_with(test_config(&[])?, room_service).await
    }

    /// Spawn a server with explicit config and room service.
    ///
    /// The server binds to a random available port (127.0.0.1:0) and runs
    /// in the background until dropped.
    pub async fn spawn_with(
        config: Config,
        room_service: Arc<dyn RoomServiceTrait>,
    ) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState::new(config.clone(), room_service));

        // Build routes using the token server's real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Signer matching the server's key pair, for verifying issued tokens.
    pub fn signer(&self) -> AccessTokenSigner {
        AccessTokenSigner::new(
            self.config.media_api_key.clone(),
            self.config.media_api_secret.clone(),
        )
    }
}

impl Drop for TestTokenServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestTokenServer::spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_servers_different_ports() -> Result<(), anyhow::Error> {
        let server1 = TestTokenServer::spawn().await?;
        let server2 = TestTokenServer::spawn().await?;

        assert_ne!(server1.addr(), server2.addr());

        Ok(())
    }

    #[tokio::test]
    async fn test_server_provides_config_access() -> Result<(), anyhow::Error> {
        let server = TestTokenServer::spawn().await?;

        assert_eq!(server.config().media_api_key, TEST_API_KEY);
        assert_eq!(server.signer().api_key(), TEST_API_KEY);

        Ok(())
    }
}
