use crate::client::helpers::{Harness, WAIT};

use gateway_core::{ConnectionState, GatewayError};

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::time::timeout;

#[tokio::test]
async fn given_disconnected_client_when_requesting_then_not_connected() {
    let harness = Harness::new();

    let result = harness.client.request("health", json!({})).await;

    assert!(matches!(result, Err(GatewayError::NotConnected { .. })));
    assert_eq!(harness.connector.opened(), 0);
}

#[tokio::test]
async fn given_connected_client_when_requesting_then_payload_returned() {
    // GIVEN
    let harness = Harness::new();
    let mut server = harness.connect().await;

    // WHEN
    let pending = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.request("sessions.list", json!({"limit": 5})).await })
    };
    let (id, params) = server.expect_request("sessions.list").await;
    server.respond_ok(&id, json!({"sessions": [{"key": "main"}]}));

    // THEN
    assert_eq!(params, json!({"limit": 5}));
    let payload = pending.await.unwrap().unwrap();
    assert_eq!(payload, json!({"sessions": [{"key": "main"}]}));
    assert_eq!(harness.client.pending_request_count(), 0);
}

/// **VALUE**: Verifies concurrent requests to the same method are matched by
/// id, not by arrival order.
///
/// **WHY THIS MATTERS**: The gateway answers slow methods late. Two panels
/// asking for different sessions must each get their own answer.
///
/// **BUG THIS CATCHES**: Would catch a FIFO-style correlator that hands the
/// first response to the first caller.
#[tokio::test]
async fn given_two_concurrent_requests_when_answered_out_of_order_then_each_gets_its_own() {
    // GIVEN: Two in-flight requests with distinct params
    let harness = Harness::new();
    let mut server = harness.connect().await;
    let spawn_request = |session: &'static str| {
        let client = harness.client.clone();
        tokio::spawn(async move { client.request("session.get", json!({"key": session})).await })
    };
    let alpha = spawn_request("alpha");
    let beta = spawn_request("beta");

    let mut ids = HashMap::new();
    for _ in 0..2 {
        let (id, params) = server.expect_request("session.get").await;
        ids.insert(params["key"].as_str().unwrap().to_string(), id);
    }

    // WHEN: The gateway answers in reverse order
    server.respond_ok(&ids["beta"], json!({"key": "beta"}));
    server.respond_ok(&ids["alpha"], json!({"key": "alpha"}));

    // THEN
    assert_eq!(alpha.await.unwrap().unwrap(), json!({"key": "alpha"}));
    assert_eq!(beta.await.unwrap().unwrap(), json!({"key": "beta"}));
}

#[tokio::test]
async fn given_error_response_when_requesting_then_request_failed() {
    let harness = Harness::new();
    let mut server = harness.connect().await;
    let pending = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.request("chat.send", json!({})).await })
    };

    let (id, _) = server.expect_request("chat.send").await;
    server.respond_error(&id, "session is busy");

    let error = pending.await.unwrap().unwrap_err();
    assert!(matches!(error, GatewayError::RequestFailed { .. }));
    assert_eq!(error.detail(), Some("session is busy"));
    assert!(harness.client.is_connected());
}

/// **VALUE**: Verifies a request times out and a late response is ignored.
///
/// **BUG THIS CATCHES**: Would catch a late response resolving a spent caller,
/// a leaked pending entry, or the timeout tearing down the connection.
#[tokio::test(start_paused = true)]
async fn given_slow_gateway_when_request_times_out_then_late_response_ignored() {
    // GIVEN
    let harness = Harness::new();
    let mut server = harness.connect().await;
    let pending = {
        let client = harness.client.clone();
        tokio::spawn(async move {
            client
                .request_with_timeout("slow", json!({}), Duration::from_secs(1))
                .await
        })
    };
    let (late_id, _) = server.expect_request("slow").await;

    // WHEN
    let result = pending.await.unwrap();

    // THEN
    assert!(matches!(result, Err(GatewayError::Timeout { .. })));
    assert_eq!(harness.client.pending_request_count(), 0);

    // AND: The late answer changes nothing and the connection still works
    server.respond_ok(&late_id, json!("too late"));
    let next = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.request("health", json!({})).await })
    };
    let (id, _) = server.expect_request("health").await;
    server.respond_ok(&id, json!({"ok": true}));
    assert_eq!(next.await.unwrap().unwrap(), json!({"ok": true}));
    assert_eq!(harness.client.state(), ConnectionState::Connected);
}

/// **VALUE**: Verifies a policy close fails every pending request with the
/// gateway's reason.
///
/// **WHY THIS MATTERS**: When a token is revoked mid-session, every waiting
/// panel should show why, not a generic "not connected".
#[tokio::test]
async fn given_pending_requests_when_gateway_closes_with_policy_reason_then_all_fail_with_it() {
    // GIVEN
    let harness = Harness::new();
    let mut server = harness.connect().await;
    let pending: Vec<_> = (0..2)
        .map(|_| {
            let client = harness.client.clone();
            tokio::spawn(async move { client.request("agents.list", json!({})).await })
        })
        .collect();
    for _ in 0..2 {
        server.expect_request("agents.list").await;
    }

    // WHEN
    server.close(1008, Some("token revoked"));

    // THEN
    for request in pending {
        let error = request.await.unwrap().unwrap_err();
        assert!(matches!(error, GatewayError::ConnectionFailed { .. }));
        assert_eq!(error.detail(), Some("token revoked"));
    }
    assert_eq!(harness.client.state(), ConnectionState::Reconnecting);
    assert!(harness.client.is_reconnecting());
    assert_eq!(harness.client.last_failure().unwrap().detail(), Some("token revoked"));

    let after = harness.client.request("health", json!({})).await;
    assert!(matches!(after, Err(GatewayError::NotConnected { .. })));
}

#[tokio::test]
async fn given_send_fails_when_requesting_then_not_connected_and_reconnecting() {
    let harness = Harness::new();
    let server = harness.connect().await;
    server.probe.fail_sends.store(true, Ordering::SeqCst);

    let result = timeout(WAIT, harness.client.request("health", json!({})))
        .await
        .unwrap();

    assert!(matches!(result, Err(GatewayError::NotConnected { .. })));
    assert_eq!(harness.client.state(), ConnectionState::Reconnecting);
    assert_eq!(harness.client.pending_request_count(), 0);
    assert_eq!(server.probe.close_codes(), vec![1001]);
}

/// **VALUE**: Verifies the request timeout holds even when the outbound send
/// never completes.
///
/// **WHY THIS MATTERS**: A gateway that vanished without a FIN leaves writes
/// stuck behind TCP backpressure. The caller must still get its `Timeout`.
///
/// **BUG THIS CATCHES**: Would catch the caller awaiting the send before its
/// outcome, which hangs forever once the timeout has spent the pending entry.
#[tokio::test(start_paused = true)]
async fn given_stalled_send_when_request_times_out_then_caller_gets_timeout() {
    // GIVEN: A connected client whose transport stops accepting writes
    let harness = Harness::new();
    let server = harness.connect().await;
    server.probe.stall_sends.store(true, Ordering::SeqCst);

    // WHEN
    let result = timeout(
        Duration::from_secs(60),
        harness
            .client
            .request_with_timeout("health", json!({}), Duration::from_secs(1)),
    )
    .await;

    // THEN
    let result = result.expect("Caller was still blocked on the stalled send");
    assert!(matches!(result, Err(GatewayError::Timeout { .. })));
    assert_eq!(harness.client.pending_request_count(), 0);
    assert_eq!(harness.client.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn given_stalled_send_when_gateway_closes_then_caller_released() {
    // GIVEN
    let harness = Harness::new();
    let server = harness.connect().await;
    server.probe.stall_sends.store(true, Ordering::SeqCst);
    let pending = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.request("health", json!({})).await })
    };
    timeout(WAIT, async {
        while harness.client.pending_request_count() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    // WHEN
    server.close(1008, Some("token revoked"));

    // THEN
    let error = timeout(WAIT, pending).await.unwrap().unwrap().unwrap_err();
    assert_eq!(error.detail(), Some("token revoked"));
    assert_eq!(harness.client.state(), ConnectionState::Reconnecting);
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Health {
    ok: bool,
    uptime_ms: u64,
}

#[tokio::test]
async fn given_typed_request_when_payload_matches_then_decoded() {
    let harness = Harness::new();
    let mut server = harness.connect().await;
    let pending = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.request_typed::<Health>("health", json!({})).await })
    };

    let (id, _) = server.expect_request("health").await;
    server.respond_ok(&id, json!({"ok": true, "uptimeMs": 4200}));

    assert_eq!(
        pending.await.unwrap().unwrap(),
        Health {
            ok: true,
            uptime_ms: 4200
        }
    );
}

#[tokio::test]
async fn given_typed_request_when_payload_mismatches_then_invalid_response() {
    let harness = Harness::new();
    let mut server = harness.connect().await;
    let pending = {
        let client = harness.client.clone();
        tokio::spawn(async move { client.request_typed::<Health>("health", json!({})).await })
    };

    let (id, _) = server.expect_request("health").await;
    server.respond_ok(&id, json!({"status": "green"}));

    let error = pending.await.unwrap().unwrap_err();
    assert!(matches!(error, GatewayError::InvalidResponse { .. }));
    assert!(harness.client.is_connected());
}
