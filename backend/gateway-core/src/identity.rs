//! Device identity seam for the connect handshake.
//!
//! The keypair that identifies this dashboard installation lives outside this
//! crate. The client only describes what must be signed and hands it to a
//! [`DeviceIdentitySigner`].

use crate::error::identity::IdentityError;

use common::RedactedToken;

const PAYLOAD_VERSION_WITHOUT_NONCE: &str = "v1";
const PAYLOAD_VERSION_WITH_NONCE: &str = "v2";
const PAYLOAD_SEPARATOR: &str = "|";
const SCOPE_SEPARATOR: &str = ",";

/// Inputs of one signed connect attempt.
#[derive(Debug, Clone)]
pub struct DeviceAuthRequest {
    pub client_id: String,
    pub client_mode: String,
    pub role: String,
    pub scopes: Vec<String>,
    pub signed_at_ms: u64,
    pub token: Option<RedactedToken>,
    pub nonce: Option<String>,
}

impl DeviceAuthRequest {
    /// Deterministic string a signer is expected to sign.
    ///
    /// `v1|device|client|mode|role|scopes|signedAt|token` without a nonce,
    /// `v2|…|token|nonce` with one. A missing token is an empty field.
    pub fn payload(&self, device_id: &str) -> String {
        let version = if self.nonce.is_some() {
            PAYLOAD_VERSION_WITH_NONCE
        } else {
            PAYLOAD_VERSION_WITHOUT_NONCE
        };

        let signed_at = self.signed_at_ms.to_string();
        let scopes = self.scopes.join(SCOPE_SEPARATOR);
        let token = self.token.as_ref().map(RedactedToken::as_str).unwrap_or("");

        let mut parts: Vec<&str> = vec![
            version,
            device_id,
            self.client_id.as_str(),
            self.client_mode.as_str(),
            self.role.as_str(),
            scopes.as_str(),
            signed_at.as_str(),
            token,
        ];
        if let Some(nonce) = &self.nonce {
            parts.push(nonce.as_str());
        }

        parts.join(PAYLOAD_SEPARATOR)
    }
}

/// Result of signing a [`DeviceAuthRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDeviceAuth {
    pub device_id: String,
    pub public_key: String,
    pub signature: String,
    pub signed_at_ms: u64,
    pub nonce: Option<String>,
}

/// Opaque provider of the device signature used in `connect`.
pub trait DeviceIdentitySigner: Send + Sync {
    fn sign_connect(&self, request: &DeviceAuthRequest) -> Result<SignedDeviceAuth, IdentityError>;
}
