//! Errors raised by a [`Transport`](crate::transport::Transport).
//!
//! These stay inside the client: the coordinator classifies every transport
//! failure into a [`GatewayError`](super::GatewayError) before any caller sees it.

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError)]
pub enum TransportError {
    #[error("Transport Closed Error: channel is closed {location}")]
    Closed { location: ErrorLocation },

    #[error("Transport Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Transport Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Transport Receive Error: {message} {location}")]
    Receive {
        message: String,
        location: ErrorLocation,
    },

    #[error("Transport Ping Error: {message} {location}")]
    Ping {
        message: String,
        location: ErrorLocation,
    },
}

impl TransportError {
    #[track_caller]
    pub fn closed() -> Self {
        TransportError::Closed {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn connect(message: impl Into<String>) -> Self {
        TransportError::Connect {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn send(message: impl Into<String>) -> Self {
        TransportError::Send {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn receive(message: impl Into<String>) -> Self {
        TransportError::Receive {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn ping(message: impl Into<String>) -> Self {
        TransportError::Ping {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
