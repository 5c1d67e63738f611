//! Connect handshake payloads.

use crate::config::ClientInfo;
use crate::identity::SignedDeviceAuth;
use crate::protocol::{DEFAULT_TICK_INTERVAL_MS, PROTOCOL_VERSION};

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

/// Params of the `connect` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub min_protocol: u32,
    pub max_protocol: u32,
    pub client: ClientDescriptor,
    pub device: DeviceDescriptor,
    pub role: String,
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDescriptor {
    pub id: String,
    pub version: String,
    pub platform: String,
    pub mode: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub id: String,
    pub public_key: String,
    pub signature: String,
    pub signed_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

#[derive(Clone, PartialEq, Serialize)]
pub struct AuthParams {
    pub token: String,
}

impl std::fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthParams")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl From<&ClientInfo> for ClientDescriptor {
    fn from(info: &ClientInfo) -> Self {
        Self {
            id: info.id.clone(),
            version: info.version.clone(),
            platform: info.platform.clone(),
            mode: info.mode.clone(),
            display_name: info.display_name.clone(),
        }
    }
}

impl From<SignedDeviceAuth> for DeviceDescriptor {
    fn from(signed: SignedDeviceAuth) -> Self {
        Self {
            id: signed.device_id,
            public_key: signed.public_key,
            signature: signed.signature,
            signed_at: signed.signed_at_ms,
            nonce: signed.nonce,
        }
    }
}

impl ConnectParams {
    pub fn new(
        client: &ClientInfo,
        device: SignedDeviceAuth,
        role: &str,
        scopes: &[String],
        token: Option<&str>,
    ) -> Self {
        Self {
            min_protocol: PROTOCOL_VERSION,
            max_protocol: PROTOCOL_VERSION,
            client: ClientDescriptor::from(client),
            device: DeviceDescriptor::from(device),
            role: role.to_string(),
            scopes: scopes.to_vec(),
            auth: token.map(|token| AuthParams {
                token: token.to_string(),
            }),
        }
    }
}

/// Negotiated tick interval from a `connect` response.
///
/// Reads `policy.tickIntervalMs`; falls back to the default when it is
/// absent, not an integer, or not positive.
pub fn tick_interval_from_hello(payload: &Value) -> Duration {
    let millis = payload
        .pointer("/policy/tickIntervalMs")
        .and_then(Value::as_i64)
        .filter(|millis| *millis > 0)
        .map(|millis| millis as u64)
        .unwrap_or(DEFAULT_TICK_INTERVAL_MS);

    Duration::from_millis(millis)
}

/// Nonce carried by a `connect.challenge` event, if present and non-empty.
pub fn challenge_nonce(payload: &Value) -> Option<String> {
    payload
        .get("nonce")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|nonce| !nonce.is_empty())
        .map(str::to_string)
}
