use crate::client::helpers::{GATEWAY_URL, Harness, TEST_NONCE, WAIT};

use gateway_core::{ConnectionState, GatewayError};

use common::RedactedToken;

use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;
use tokio::time::{Instant, timeout};

/// **VALUE**: Walks the full challenge-signed handshake against the gateway.
///
/// **WHY THIS MATTERS**: Every other feature depends on this exchange. The
/// gateway checks the nonce, the protocol range and the signed payload.
///
/// **BUG THIS CATCHES**: Would catch the nonce not reaching the signer, a
/// wrong URL derivation, or the negotiated tick interval being dropped.
#[tokio::test]
async fn given_gateway_when_connecting_then_signed_handshake_completes() {
    // GIVEN: A client and a token
    let harness = Harness::new();
    let token = RedactedToken::new("gw-token");

    // WHEN: Connecting while the gateway answers the handshake
    let connecting = {
        let client = harness.client.clone();
        let token = token.clone();
        tokio::spawn(async move { client.connect(GATEWAY_URL, Some(&token)).await })
    };

    let mut server = harness.connector.next_server().await;
    assert_eq!(server.url.as_str(), "ws://127.0.0.1:18789/");
    server.send_challenge(TEST_NONCE);

    let (id, params) = server.expect_request("connect").await;
    server.respond_ok(&id, json!({"policy": {"tickIntervalMs": 15_000}}));
    connecting.await.unwrap().unwrap();

    // THEN: The connect params carried the signed nonce and the token
    assert_eq!(params["minProtocol"], 3);
    assert_eq!(params["maxProtocol"], 3);
    assert_eq!(params["role"], "operator");
    assert_eq!(params["scopes"], json!(["operator.admin"]));
    assert_eq!(params["client"]["mode"], "ui");
    assert_eq!(params["device"]["id"], "device-test");
    assert_eq!(params["device"]["nonce"], TEST_NONCE);
    assert_eq!(params["auth"]["token"], "gw-token");
    let signature = params["device"]["signature"].as_str().unwrap();
    assert!(signature.starts_with("signed:v2|device-test|"), "{signature}");
    assert!(signature.ends_with(&format!("|gw-token|{TEST_NONCE}")), "{signature}");

    // AND: The client is connected with the negotiated tick interval
    let client = &harness.client;
    assert_eq!(client.state(), ConnectionState::Connected);
    assert!(client.is_connected());
    assert!(client.has_transport());
    assert!(client.last_failure().is_none());
    assert_eq!(client.tick_interval(), Duration::from_millis(15_000));

    let signed = harness.signer.last_request.lock().clone().unwrap();
    assert_eq!(signed.nonce.as_deref(), Some(TEST_NONCE));
    assert_eq!(signed.token.as_ref().map(RedactedToken::as_str), Some("gw-token"));
}

#[tokio::test]
async fn given_hello_without_policy_when_connected_then_default_tick_interval() {
    let harness = Harness::new();

    let _server = harness.connect_with_hello(json!({})).await;

    assert_eq!(harness.client.tick_interval(), Duration::from_millis(30_000));
}

/// **VALUE**: Verifies a gateway that never sends `connect.challenge` fails the
/// connect after the challenge timeout.
///
/// **WHY THIS MATTERS**: Old gateways and wrong ports accept the socket but
/// never speak. The dashboard must get an error instead of hanging.
///
/// **BUG THIS CATCHES**: Would catch the attempt staying `Connecting` forever,
/// or the half-open transport being left behind.
#[tokio::test(start_paused = true)]
async fn given_silent_gateway_when_connecting_then_fails_after_challenge_timeout() {
    // GIVEN: A gateway that accepts but never challenges
    let harness = Harness::new();
    let started = Instant::now();

    // WHEN
    let connecting = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.connect(GATEWAY_URL, None).await })
    };
    let server = harness.connector.next_server().await;
    let result = connecting.await.unwrap();

    // THEN
    match result {
        Err(GatewayError::ConnectionFailed { reason, .. }) => {
            assert_eq!(reason, "Timed out waiting for connect.challenge");
        }
        other => panic!("Expected ConnectionFailed, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_secs(6));
    assert_eq!(harness.client.state(), ConnectionState::Disconnected);
    assert!(!harness.client.has_transport());
    assert_eq!(server.probe.close_codes(), vec![1000]);
}

#[tokio::test]
async fn given_gateway_rejects_connect_when_connecting_then_request_error_returned() {
    // GIVEN
    let harness = Harness::new();
    let connecting = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.connect(GATEWAY_URL, None).await })
    };
    let mut server = harness.connector.next_server().await;
    server.send_challenge(TEST_NONCE);

    // WHEN: The gateway refuses the device
    let (id, _) = server.expect_request("connect").await;
    server.respond_error(&id, "pairing required");
    let result = connecting.await.unwrap();

    // THEN
    let error = result.unwrap_err();
    assert!(matches!(error, GatewayError::RequestFailed { .. }));
    assert_eq!(error.detail(), Some("pairing required"));
    assert_eq!(harness.client.state(), ConnectionState::Disconnected);
    assert!(!harness.client.has_transport());
    assert_eq!(server.probe.close_codes(), vec![1000]);
    assert_eq!(harness.client.last_failure().unwrap().detail(), Some("pairing required"));
}

#[tokio::test]
async fn given_unreachable_gateway_when_connecting_then_connection_failed() {
    let harness = Harness::new();
    harness.connector.fail_open.store(true, Ordering::SeqCst);

    let result = harness.client.connect(GATEWAY_URL, None).await;

    match result {
        Err(GatewayError::ConnectionFailed { reason, .. }) => {
            assert!(reason.contains("connection refused"), "{reason}");
        }
        other => panic!("Expected ConnectionFailed, got {other:?}"),
    }
    assert_eq!(harness.client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn given_unsupported_url_when_connecting_then_nothing_opened() {
    let harness = Harness::new();

    let result = harness.client.connect("ftp://127.0.0.1/files", None).await;

    assert!(matches!(result, Err(GatewayError::ConnectionFailed { .. })));
    assert_eq!(harness.connector.opened(), 0);
    assert_eq!(harness.client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn given_signer_fails_when_connecting_then_connection_failed_and_transport_closed() {
    // GIVEN
    let harness = Harness::new();
    harness.signer.fail.store(true, Ordering::SeqCst);
    let connecting = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.connect(GATEWAY_URL, None).await })
    };
    let server = harness.connector.next_server().await;

    // WHEN
    server.send_challenge(TEST_NONCE);
    let result = connecting.await.unwrap();

    // THEN
    match result {
        Err(GatewayError::ConnectionFailed { reason, .. }) => {
            assert!(reason.contains("signing failed"), "{reason}");
            assert!(reason.contains("keychain locked"), "{reason}");
        }
        other => panic!("Expected ConnectionFailed, got {other:?}"),
    }
    assert_eq!(server.probe.close_codes(), vec![1000]);
}

/// **VALUE**: Verifies a policy-violation close during the handshake surfaces
/// the gateway's reason.
///
/// **BUG THIS CATCHES**: Would catch the attempt moving to `Reconnecting`
/// (explicit connects are never retried) or the reason being swallowed.
#[tokio::test]
async fn given_policy_close_before_challenge_when_connecting_then_reason_returned() {
    // GIVEN
    let harness = Harness::new();
    let connecting = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.connect(GATEWAY_URL, None).await })
    };
    let server = harness.connector.next_server().await;

    // WHEN
    server.close(1008, Some("device not paired"));
    let result = connecting.await.unwrap();

    // THEN
    let error = result.unwrap_err();
    assert!(matches!(error, GatewayError::ConnectionFailed { .. }));
    assert_eq!(error.detail(), Some("device not paired"));
    assert_eq!(harness.client.state(), ConnectionState::Disconnected);
    assert!(!harness.client.has_transport());
}

#[tokio::test]
async fn given_plain_close_before_challenge_when_connecting_then_connection_failed() {
    let harness = Harness::new();
    let connecting = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.connect(GATEWAY_URL, None).await })
    };
    let mut server = harness.connector.next_server().await;

    server.hang_up();
    let result = connecting.await.unwrap();

    let error = result.unwrap_err();
    assert_eq!(error.detail(), Some("Connection closed before connect.challenge"));
    assert_eq!(harness.client.state(), ConnectionState::Disconnected);
}

/// **VALUE**: Verifies a close between the challenge and the `connect`
/// response still fails the attempt as `ConnectionFailed`.
///
/// **BUG THIS CATCHES**: Would catch the pending `connect` request's
/// `NotConnected` leaking out, which callers read as "never tried".
#[tokio::test]
async fn given_plain_close_after_challenge_when_connecting_then_connection_failed() {
    // GIVEN: The handshake reached the connect request
    let harness = Harness::new();
    let connecting = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.connect(GATEWAY_URL, None).await })
    };
    let mut server = harness.connector.next_server().await;
    server.send_challenge(TEST_NONCE);
    server.expect_request("connect").await;

    // WHEN
    server.close(1000, None);
    let result = connecting.await.unwrap();

    // THEN
    let error = result.unwrap_err();
    assert!(matches!(error, GatewayError::ConnectionFailed { .. }));
    assert_eq!(error.detail(), Some("Connection closed during handshake"));
    assert_eq!(harness.client.state(), ConnectionState::Disconnected);
    assert_eq!(
        harness.client.last_failure().unwrap().detail(),
        Some("Connection closed during handshake")
    );
}

/// **VALUE**: Verifies an explicit disconnect leaves nothing behind.
///
/// **WHY THIS MATTERS**: The dashboard disconnects when the user switches
/// gateways. Anything left pending would hang a panel forever.
///
/// **BUG THIS CATCHES**: Would catch pending requests not being failed,
/// subscriber streams not ending, or a second disconnect misbehaving.
#[tokio::test]
async fn given_pending_work_when_disconnecting_then_everything_torn_down() {
    // GIVEN: A subscriber and an in-flight request
    let harness = Harness::new();
    let mut server = harness.connect().await;
    let mut events = harness.client.events();
    let pending = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.request("health", json!({})).await })
    };
    server.expect_request("health").await;

    // WHEN
    harness.client.disconnect().await;

    // THEN
    let result = pending.await.unwrap();
    assert!(matches!(result, Err(GatewayError::NotConnected { .. })));
    assert!(timeout(WAIT, events.recv()).await.unwrap().is_none());

    let client = &harness.client;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.pending_request_count(), 0);
    assert_eq!(client.subscriber_count(), 0);
    assert!(!client.has_transport());
    assert_eq!(server.probe.close_codes(), vec![1000]);

    // AND: Disconnecting again is a no-op
    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(server.probe.close_codes(), vec![1000]);
}

#[tokio::test]
async fn given_never_connected_when_disconnecting_then_stays_disconnected() {
    let harness = Harness::new();

    harness.client.disconnect().await;

    assert_eq!(harness.client.state(), ConnectionState::Disconnected);
}

/// **VALUE**: Verifies `connect` on a live client replaces the connection
/// softly.
///
/// **BUG THIS CATCHES**: Would catch a reconnect that ends subscriber streams,
/// forcing every panel to re-subscribe after a manual reconnect.
#[tokio::test]
async fn given_connected_when_connecting_again_then_old_transport_closed_and_subscribers_kept() {
    // GIVEN
    let harness = Harness::new();
    let first = harness.connect().await;
    let mut events = harness.client.events();

    // WHEN
    let second = harness.connect().await;

    // THEN
    assert_eq!(first.probe.close_codes(), vec![1001]);
    assert_eq!(harness.connector.opened(), 2);
    assert_eq!(harness.client.subscriber_count(), 1);

    second.send_event("presence", json!({"who": "ops"}), Some(1));
    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.event, "presence");
}

#[tokio::test]
async fn given_state_watcher_when_connecting_then_observes_connected() {
    let harness = Harness::new();
    let mut state = harness.client.watch_state();
    assert_eq!(*state.borrow(), ConnectionState::Disconnected);

    let _server = harness.connect().await;

    let connected = timeout(WAIT, state.wait_for(|state| *state == ConnectionState::Connected))
        .await
        .unwrap()
        .map(|state| *state);
    assert_eq!(connected.unwrap(), ConnectionState::Connected);
}
