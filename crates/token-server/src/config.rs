//! Token server configuration.
//!
//! Configuration is loaded from environment variables. The media API secret
//! is held as a `SecretString` and redacted in Debug output.

use common::jwt::{DEFAULT_TOKEN_TTL, MAX_TOKEN_TTL, MIN_TOKEN_TTL};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default media service base URL.
pub const DEFAULT_MEDIA_URL: &str = "http://localhost:7880";

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default timeout for room API calls in seconds.
pub const DEFAULT_ROOM_SERVICE_TIMEOUT_SECONDS: u64 = 10;

/// Longest allowed room API timeout in seconds.
pub const MAX_ROOM_SERVICE_TIMEOUT_SECONDS: u64 = 60;

/// Token server configuration.
#[derive(Clone)]
pub struct Config {
    /// Media service API key; becomes the `iss` claim of issued tokens.
    pub media_api_key: String,

    /// Media service API secret used to sign tokens.
    pub media_api_secret: SecretString,

    /// Media service base URL (default: "http://localhost:7880").
    pub media_url: String,

    /// Server bind address (default: "0.0.0.0:3000").
    pub bind_address: String,

    /// Lifetime of issued room tokens in seconds (default: 21600).
    pub token_ttl_seconds: u64,

    /// Timeout for room API calls in seconds (default: 10).
    pub room_service_timeout_seconds: u64,

    /// Seconds to wait after a shutdown signal before exiting (default: 0).
    pub drain_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("media_api_key", &self.media_api_key)
            .field("media_api_secret", &"[REDACTED]")
            .field("media_url", &self.media_url)
            .field("bind_address", &self.bind_address)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field(
                "room_service_timeout_seconds",
                &self.room_service_timeout_seconds,
            )
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid token TTL configuration: {0}")]
    InvalidTokenTtl(String),

    #[error("Invalid room service timeout configuration: {0}")]
    InvalidRoomServiceTimeout(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let media_api_key = required(vars, "MEDIA_API_KEY")?;
        let media_api_secret = SecretString::from(required(vars, "MEDIA_API_SECRET")?);

        let media_url = vars
            .get("MEDIA_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_MEDIA_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let token_ttl_seconds = if let Some(value_str) = vars.get("TOKEN_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTokenTtl(format!(
                    "TOKEN_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value < MIN_TOKEN_TTL.as_secs() || value > MAX_TOKEN_TTL.as_secs() {
                return Err(ConfigError::InvalidTokenTtl(format!(
                    "TOKEN_TTL_SECONDS must be between {} and {}, got {}",
                    MIN_TOKEN_TTL.as_secs(),
                    MAX_TOKEN_TTL.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_TOKEN_TTL.as_secs()
        };

        let room_service_timeout_seconds =
            if let Some(value_str) = vars.get("ROOM_SERVICE_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidRoomServiceTimeout(format!(
                        "ROOM_SERVICE_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_ROOM_SERVICE_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidRoomServiceTimeout(format!(
                        "ROOM_SERVICE_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_ROOM_SERVICE_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_ROOM_SERVICE_TIMEOUT_SECONDS
            };

        let drain_seconds = match vars.get("TS_DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "TS_DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => 0,
        };

        Ok(Config {
            media_api_key,
            media_api_secret,
            media_url,
            bind_address,
            token_ttl_seconds,
            room_service_timeout_seconds,
            drain_seconds,
        })
    }

    /// Lifetime of issued room tokens.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }

    /// Timeout for room API calls.
    pub fn room_service_timeout(&self) -> Duration {
        Duration::from_secs(self.room_service_timeout_seconds)
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}
