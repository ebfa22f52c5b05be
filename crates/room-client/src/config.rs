//! Room client configuration.
//!
//! Loaded from environment variables (or a map in tests) the same way the
//! token server loads its own.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default room directory refresh interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Shortest accepted room directory refresh interval in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 250;

/// Default token fetch timeout in milliseconds.
pub const DEFAULT_TOKEN_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Default bound on connect plus room-ready, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 15_000;

/// Room client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Token server base URL (e.g., "http://192.168.1.20:3000").
    pub token_server_url: String,

    /// Media service WebSocket URL passed to the transport on join.
    pub media_ws_url: String,

    /// Room directory refresh interval.
    pub poll_interval: Duration,

    /// Bound on a single token fetch.
    pub token_fetch_timeout: Duration,

    /// Bound on transport connect plus the first room-ready signal.
    pub connect_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid duration configuration: {0}")]
    InvalidDuration(String),
}

impl ClientConfig {
    /// Create a configuration with default timings.
    pub fn new(token_server_url: impl Into<String>, media_ws_url: impl Into<String>) -> Self {
        Self {
            token_server_url: token_server_url.into().trim_end_matches('/').to_string(),
            media_ws_url: media_ws_url.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            token_fetch_timeout: Duration::from_millis(DEFAULT_TOKEN_FETCH_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let token_server_url = vars
            .get("TOKEN_SERVER_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TOKEN_SERVER_URL".to_string()))?;

        let media_ws_url = vars
            .get("MEDIA_WS_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("MEDIA_WS_URL".to_string()))?;

        let mut config = Self::new(token_server_url.as_str(), media_ws_url.as_str());

        config.poll_interval = parse_millis(
            vars,
            "ROOM_POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL_MS,
            MIN_POLL_INTERVAL_MS,
        )?;
        config.token_fetch_timeout = parse_millis(
            vars,
            "TOKEN_FETCH_TIMEOUT_MS",
            DEFAULT_TOKEN_FETCH_TIMEOUT_MS,
            1,
        )?;
        config.connect_timeout =
            parse_millis(vars, "CONNECT_TIMEOUT_MS", DEFAULT_CONNECT_TIMEOUT_MS, 1)?;

        Ok(config)
    }
}

fn parse_millis(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    min: u64,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(Duration::from_millis(default));
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidDuration(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value < min {
        return Err(ConfigError::InvalidDuration(format!(
            "{} must be at least {}, got {}",
            name, min, value
        )));
    }

    Ok(Duration::from_millis(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "TOKEN_SERVER_URL".to_string(),
                "http://192.168.1.20:3000/".to_string(),
            ),
            (
                "MEDIA_WS_URL".to_string(),
                "ws://192.168.1.20:7880".to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = ClientConfig::from_vars(&base_vars()).expect("Config should load");

        assert_eq!(config.token_server_url, "http://192.168.1.20:3000");
        assert_eq!(config.media_ws_url, "ws://192.168.1.20:7880");
        assert_eq!(config.poll_interval, Duration::from_millis(3000));
        assert_eq!(config.token_fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_from_vars_custom_timings() {
        let mut vars = base_vars();
        vars.insert("ROOM_POLL_INTERVAL_MS".to_string(), "1000".to_string());
        vars.insert("TOKEN_FETCH_TIMEOUT_MS".to_string(), "2500".to_string());
        vars.insert("CONNECT_TIMEOUT_MS".to_string(), "5000".to_string());

        let config = ClientConfig::from_vars(&vars).unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.token_fetch_timeout, Duration::from_millis(2500));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_token_server_url() {
        let mut vars = base_vars();
        vars.remove("TOKEN_SERVER_URL");

        let result = ClientConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "TOKEN_SERVER_URL"));
    }

    #[test]
    fn test_missing_media_ws_url() {
        let mut vars = base_vars();
        vars.remove("MEDIA_WS_URL");

        let result = ClientConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "MEDIA_WS_URL"));
    }

    #[test]
    fn test_poll_interval_below_minimum_rejected() {
        let mut vars = base_vars();
        vars.insert("ROOM_POLL_INTERVAL_MS".to_string(), "100".to_string());

        let result = ClientConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidDuration(msg)) if msg.contains("at least 250"))
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut vars = base_vars();
        vars.insert("CONNECT_TIMEOUT_MS".to_string(), "0".to_string());

        assert!(ClientConfig::from_vars(&vars).is_err());
    }

    #[test]
    fn test_non_numeric_rejected() {
        let mut vars = base_vars();
        vars.insert("TOKEN_FETCH_TIMEOUT_MS".to_string(), "ten".to_string());

        let result = ClientConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidDuration(msg)) if msg.contains("valid positive integer"))
        );
    }
}
