//! Resilient RPC client for the automation gateway.
//!
//! ## Architecture
//!
//! - **transport**: framed duplex channel trait plus the WebSocket implementation
//! - **protocol**: JSON frames and the `connect` handshake payloads
//! - **identity**: seam to the external device signer
//! - **client**: connection lifecycle, request correlation, event fanout, keepalive
//! - **config** / **logger**: settings and log output for host applications

pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod logger;
pub mod protocol;
pub mod transport;

pub use client::{ConnectionState, EventSubscription, GatewayClient, GatewayEvent};
pub use config::GatewayConfig;
pub use error::GatewayError;

#[cfg(test)]
mod tests;
