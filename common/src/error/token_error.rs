use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Errors raised by [`RedactedToken`](crate::RedactedToken).
#[derive(Debug, ThisError)]
pub enum TokenError {
    #[error("Gateway token is blank {location}")]
    Blank { location: ErrorLocation },

    #[error("Gateway token cannot be serialized: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },
}
