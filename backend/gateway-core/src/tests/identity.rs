use crate::identity::DeviceAuthRequest;

use common::RedactedToken;

fn request(token: Option<&str>, nonce: Option<&str>) -> DeviceAuthRequest {
    DeviceAuthRequest {
        client_id: "gateway-dashboard".to_string(),
        client_mode: "ui".to_string(),
        role: "operator".to_string(),
        scopes: vec!["operator.admin".to_string(), "operator.read".to_string()],
        signed_at_ms: 1_700_000_000_123,
        token: token.map(RedactedToken::new),
        nonce: nonce.map(str::to_string),
    }
}

/// **VALUE**: Pins the exact signed payload layout.
///
/// **WHY THIS MATTERS**: The gateway rebuilds this string to verify the
/// signature. One field out of place and every handshake fails.
#[test]
fn given_nonce_when_building_payload_then_v2_with_trailing_nonce() {
    let payload = request(Some("tok"), Some("n-42")).payload("device-1");

    assert_eq!(
        payload,
        "v2|device-1|gateway-dashboard|ui|operator|operator.admin,operator.read|1700000000123|tok|n-42"
    );
}

#[test]
fn given_no_nonce_when_building_payload_then_v1() {
    let payload = request(Some("tok"), None).payload("device-1");

    assert_eq!(
        payload,
        "v1|device-1|gateway-dashboard|ui|operator|operator.admin,operator.read|1700000000123|tok"
    );
}

#[test]
fn given_no_token_when_building_payload_then_empty_token_field() {
    let payload = request(None, Some("n")).payload("d");

    assert!(payload.ends_with("|1700000000123||n"), "got {payload}");
}

#[test]
fn given_request_with_token_when_debug_formatted_then_token_hidden() {
    let debug = format!("{:?}", request(Some("very-secret-token"), None));

    assert!(!debug.contains("very-secret-token"));
}
