use crate::config::ClientInfo;
use crate::identity::SignedDeviceAuth;
use crate::protocol::{ConnectParams, PROTOCOL_VERSION, challenge_nonce, tick_interval_from_hello};

use std::time::Duration;

use serde_json::json;

fn client_info() -> ClientInfo {
    ClientInfo {
        id: "gateway-dashboard".to_string(),
        version: "1.2.3".to_string(),
        platform: "macos".to_string(),
        mode: "ui".to_string(),
        display_name: "Dashboard".to_string(),
    }
}

fn signed() -> SignedDeviceAuth {
    SignedDeviceAuth {
        device_id: "dev-1".to_string(),
        public_key: "pk".to_string(),
        signature: "sig".to_string(),
        signed_at_ms: 1_700_000_000_000,
        nonce: Some("n-1".to_string()),
    }
}

/// **VALUE**: Verifies the `connect` params serialize with the gateway's
/// camelCase field names.
///
/// **BUG THIS CATCHES**: A missing `rename_all` would send `min_protocol` and
/// `display_name`, which the gateway rejects during the handshake.
#[test]
fn given_connect_params_when_serialized_then_camel_case_wire_shape() {
    // GIVEN
    let params = ConnectParams::new(
        &client_info(),
        signed(),
        "operator",
        &["operator.admin".to_string()],
        Some("secret"),
    );

    // WHEN
    let value = serde_json::to_value(&params).unwrap();

    // THEN
    assert_eq!(
        value,
        json!({
            "minProtocol": PROTOCOL_VERSION,
            "maxProtocol": PROTOCOL_VERSION,
            "client": {
                "id": "gateway-dashboard",
                "version": "1.2.3",
                "platform": "macos",
                "mode": "ui",
                "displayName": "Dashboard"
            },
            "device": {
                "id": "dev-1",
                "publicKey": "pk",
                "signature": "sig",
                "signedAt": 1_700_000_000_000u64,
                "nonce": "n-1"
            },
            "role": "operator",
            "scopes": ["operator.admin"],
            "auth": {"token": "secret"}
        })
    );
}

#[test]
fn given_no_token_when_serialized_then_auth_omitted() {
    let params = ConnectParams::new(&client_info(), signed(), "operator", &[], None);

    let value = serde_json::to_value(&params).unwrap();

    assert!(value.get("auth").is_none());
}

#[test]
fn given_connect_params_when_debug_formatted_then_token_hidden() {
    let params = ConnectParams::new(&client_info(), signed(), "operator", &[], Some("hunter2"));

    let debug = format!("{params:?}");

    assert!(!debug.contains("hunter2"));
}

#[test]
fn given_hello_with_policy_when_reading_tick_interval_then_uses_it() {
    let hello = json!({"policy": {"tickIntervalMs": 15000}});

    assert_eq!(tick_interval_from_hello(&hello), Duration::from_millis(15_000));
}

#[test]
fn given_hello_without_usable_policy_when_reading_tick_interval_then_default() {
    let hellos = [
        json!({}),
        json!({"policy": {}}),
        json!({"policy": {"tickIntervalMs": 0}}),
        json!({"policy": {"tickIntervalMs": -5}}),
        json!({"policy": {"tickIntervalMs": "fast"}}),
    ];

    for hello in hellos {
        assert_eq!(
            tick_interval_from_hello(&hello),
            Duration::from_millis(30_000),
            "{hello} should fall back to the default"
        );
    }
}

#[test]
fn given_challenge_payloads_when_reading_nonce_then_only_non_empty_strings_count() {
    assert_eq!(challenge_nonce(&json!({"nonce": "abc"})), Some("abc".to_string()));
    assert_eq!(challenge_nonce(&json!({"nonce": ""})), None);
    assert_eq!(challenge_nonce(&json!({"nonce": "   "})), None);
    assert_eq!(challenge_nonce(&json!({"nonce": 7})), None);
    assert_eq!(challenge_nonce(&json!({})), None);
}
