//! Gateway auth token with redacted formatting.
//!
//! The token travels in two places only: the signed device payload and the
//! `auth` block of the `connect` request. Everywhere else it prints as a
//! placeholder and refuses to serialize.

use crate::{ErrorLocation, TokenError};

use std::fmt;
use std::panic::Location;

use serde::ser::Error;
use zeroize::Zeroize;

#[derive(Clone, PartialEq, Eq)]
pub struct RedactedToken {
    inner: String,
}

impl RedactedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: token.into(),
        }
    }

    /// Build a token from user input (env var, config, prompt).
    ///
    /// Surrounding whitespace is dropped. A blank value is not a token: the
    /// gateway treats an empty `auth.token` as an anonymous device.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Blank`] when nothing is left after trimming.
    #[track_caller]
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TokenError::Blank {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self::new(trimmed))
    }

    /// The raw token, for the connect handshake only.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Token length (safe to log).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// Length only, so a log line can still tell two tokens apart from "none".
impl fmt::Debug for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedToken(len={})", self.inner.len())
    }
}

impl fmt::Display for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED TOKEN]")
    }
}

impl Drop for RedactedToken {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl serde::Serialize for RedactedToken {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(TokenError::Serialization {
            message: String::from("use as_str() when building the connect request"),
            location: ErrorLocation::from(Location::caller()),
        }))
    }
}
