//! Error types surfaced to callers of the gateway client.
//!
//! Key design decisions:
//! - One variant per failure kind callers can act on; no transport detail leaks out
//! - `Clone` so a single transport failure can be delivered to every pending request
//! - All errors include ErrorLocation for debugging
//! - `#[track_caller]` for automatic location capture

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Errors returned by [`GatewayClient`](crate::client::GatewayClient) operations.
#[derive(Debug, Clone, ThisError)]
pub enum GatewayError {
    #[error("Not Connected Error: no active gateway connection {location}")]
    NotConnected { location: ErrorLocation },

    #[error("Connection Failed Error: {reason} {location}")]
    ConnectionFailed {
        reason: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: gateway did not respond in time {location}")]
    Timeout { location: ErrorLocation },

    #[error("Request Failed Error: {message} {location}")]
    RequestFailed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Response Error: {message} {location}")]
    InvalidResponse {
        message: String,
        location: ErrorLocation,
    },
}

impl GatewayError {
    #[track_caller]
    pub fn not_connected() -> Self {
        GatewayError::NotConnected {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        GatewayError::ConnectionFailed {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn timeout() -> Self {
        GatewayError::Timeout {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn request_failed(message: impl Into<String>) -> Self {
        GatewayError::RequestFailed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        GatewayError::InvalidResponse {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Detail text without the location suffix, if the variant carries one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GatewayError::ConnectionFailed { reason, .. } => Some(reason),
            GatewayError::RequestFailed { message, .. } => Some(message),
            GatewayError::InvalidResponse { message, .. } => Some(message),
            GatewayError::NotConnected { .. } | GatewayError::Timeout { .. } => None,
        }
    }

    /// Get error category for logging.
    pub fn error_category(&self) -> &'static str {
        match self {
            GatewayError::NotConnected { .. } => "not_connected",
            GatewayError::ConnectionFailed { .. } => "connection_failed",
            GatewayError::Timeout { .. } => "timeout",
            GatewayError::RequestFailed { .. } => "request_failed",
            GatewayError::InvalidResponse { .. } => "invalid_response",
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        GatewayError::InvalidResponse {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
