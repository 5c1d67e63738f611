//! Shared value types for the gateway dashboard backend.
//!
//! This crate holds the small, dependency-light types every other crate in the
//! workspace needs. It has no business logic.
//!
//! ## Architecture
//!
//! - **common** (this crate): Error locations and secret wrappers
//! - **gateway-core**: The gateway RPC client built on top of them
//!
//! Keeping these here lets error types in any crate carry the same location
//! format and lets secrets cross crate boundaries without ever being printed.

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::token_error::TokenError;
pub use redacted_token::RedactedToken;

#[cfg(test)]
mod tests;
