use crate::error::config::ConfigError;

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const TOKEN_ENV_VAR: &str = "GATEWAY_TOKEN";

// ============================================
// CONFIG STRUCTS
// ============================================

/// How this client describes itself in the connect handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default = "default_client_id")]
    pub id: String,
    #[serde(default = "default_client_version")]
    pub version: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_client_mode")]
    pub mode: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            id: default_client_id(),
            version: default_client_version(),
            platform: default_platform(),
            mode: default_client_mode(),
            display_name: default_display_name(),
        }
    }
}

/// Timer settings, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_challenge_timeout_ms")]
    pub challenge_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            challenge_timeout_ms: default_challenge_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn challenge(&self) -> Duration {
        Duration::from_millis(self.challenge_timeout_ms)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub client: ClientInfo,

    #[serde(default = "default_role")]
    pub role: String,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            client: ClientInfo::default(),
            role: default_role(),
            scopes: default_scopes(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_client_id() -> String {
    "gateway-dashboard".to_string()
}
fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
fn default_platform() -> String {
    std::env::consts::OS.to_string()
}
fn default_client_mode() -> String {
    "ui".to_string()
}
fn default_display_name() -> String {
    "Gateway Dashboard".to_string()
}
fn default_role() -> String {
    "operator".to_string()
}
fn default_scopes() -> Vec<String> {
    vec!["operator.admin".to_string()]
}
fn default_challenge_timeout_ms() -> u64 {
    6_000
}
fn default_connect_timeout_ms() -> u64 {
    12_000
}
fn default_request_timeout_ms() -> u64 {
    15_000
}
fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

// ============================================
// IMPLEMENTATION
// ============================================

impl GatewayConfig {
    /// Load client settings from a TOML file.
    ///
    /// A missing file is not an error: the defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read, is not
    /// valid TOML, or fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(
                "Gateway config not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            warn!("Failed to read gateway config: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        let config: GatewayConfig = toml::from_str(&contents).map_err(|e| {
            warn!("Failed to parse gateway config: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Gateway config loaded from {}", path.display());
        Ok(config)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("client.id", &self.client.id),
            ("client.mode", &self.client.mode),
            ("role", &self.role),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{field} cannot be empty"),
                });
            }
        }

        let timeouts = [
            ("timeouts.challenge_timeout_ms", self.timeouts.challenge_timeout_ms),
            ("timeouts.connect_timeout_ms", self.timeouts.connect_timeout_ms),
            ("timeouts.request_timeout_ms", self.timeouts.request_timeout_ms),
            ("timeouts.heartbeat_interval_ms", self.timeouts.heartbeat_interval_ms),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{field} must be greater than zero"),
                });
            }
        }

        Ok(())
    }

    /// Read the gateway token from `GATEWAY_TOKEN`, honoring a `.env` file.
    ///
    /// Returns `None` when the variable is unset or blank.
    pub fn token_from_env() -> Option<RedactedToken> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {}", e);
        }

        let raw = dotenvy::var(TOKEN_ENV_VAR).ok()?;
        match RedactedToken::parse(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Ignoring {}: {}", TOKEN_ENV_VAR, e);
                None
            }
        }
    }
}
