use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failure reported by a device identity signer.
#[derive(Debug, Clone, ThisError)]
pub enum IdentityError {
    #[error("Signing Error: {message} {location}")]
    Signing {
        message: String,
        location: ErrorLocation,
    },
}

impl IdentityError {
    #[track_caller]
    pub fn signing(message: impl Into<String>) -> Self {
        IdentityError::Signing {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
