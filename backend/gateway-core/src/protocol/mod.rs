//! Gateway wire protocol: frame codec and handshake payloads.

pub mod connect;
pub mod frames;

pub use connect::{ConnectParams, challenge_nonce, tick_interval_from_hello};
pub use frames::{
    ErrorShape, EventFrame, Frame, RequestFrame, ResponseFrame, decode_frame, encode_request,
};

/// Protocol version advertised as both min and max in `connect`.
pub const PROTOCOL_VERSION: u32 = 3;

/// Reserved event carrying the handshake nonce.
pub const CHALLENGE_EVENT: &str = "connect.challenge";

pub const CONNECT_METHOD: &str = "connect";

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 30_000;

/// WebSocket close code the gateway uses to reject a client with a reason.
pub const POLICY_VIOLATION_CLOSE_CODE: u16 = 1008;

pub const NORMAL_CLOSE_CODE: u16 = 1000;

pub const GOING_AWAY_CLOSE_CODE: u16 = 1001;
