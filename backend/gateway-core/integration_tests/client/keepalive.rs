// Heartbeat and watchdog behavior under a paused clock

use crate::client::helpers::Harness;

use gateway_core::config::{GatewayConfig, TimeoutConfig};
use gateway_core::{ConnectionState, GatewayError};

use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;

/// **VALUE**: Verifies a gateway that goes silent is detected by the watchdog.
///
/// **WHY THIS MATTERS**: A gateway host that loses power never sends a close
/// frame. Without the watchdog the client would report `Connected` forever.
///
/// **BUG THIS CATCHES**: Would catch the watchdog measuring from the wrong
/// instant, using the wrong multiplier, or needing a transport error to act.
#[tokio::test(start_paused = true)]
async fn given_tick_30s_and_no_inbound_frames_when_61s_pass_then_reconnecting() {
    // GIVEN: A connection with the default 30s tick
    let harness = Harness::new();
    let server = harness.connect().await;

    // WHEN: 59s pass in silence
    sleep(Duration::from_secs(59)).await;

    // THEN: Still connected
    assert_eq!(harness.client.state(), ConnectionState::Connected);

    // WHEN: 61s have passed
    sleep(Duration::from_secs(2)).await;

    // THEN: Treated as dead without any transport error
    assert_eq!(harness.client.state(), ConnectionState::Reconnecting);
    assert!(!harness.client.has_transport());
    assert!(matches!(
        harness.client.last_failure(),
        Some(GatewayError::NotConnected { .. })
    ));
    assert_eq!(server.probe.close_codes(), vec![1001]);
}

#[tokio::test(start_paused = true)]
async fn given_inbound_traffic_when_threshold_passes_then_stays_connected() {
    let harness = Harness::new();
    let server = harness.connect().await;

    sleep(Duration::from_secs(50)).await;
    server.send_event("tick", json!({}), None);
    sleep(Duration::from_secs(11)).await;

    assert_eq!(harness.client.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn given_short_negotiated_tick_when_silent_then_watchdog_uses_it() {
    let harness = Harness::new();
    let _server = harness
        .connect_with_hello(json!({"policy": {"tickIntervalMs": 5_000}}))
        .await;

    sleep(Duration::from_secs(11)).await;

    assert_eq!(harness.client.state(), ConnectionState::Reconnecting);
}

#[tokio::test(start_paused = true)]
async fn given_connected_when_heartbeat_interval_passes_then_pings_sent() {
    // GIVEN: A 10s heartbeat
    let config = GatewayConfig {
        timeouts: TimeoutConfig {
            heartbeat_interval_ms: 10_000,
            ..TimeoutConfig::default()
        },
        ..GatewayConfig::default()
    };
    let harness = Harness::with_config(config);
    let server = harness.connect().await;

    // WHEN
    sleep(Duration::from_secs(35)).await;

    // THEN
    assert_eq!(server.probe.pings.load(Ordering::SeqCst), 3);
    assert!(harness.client.is_connected());
}

/// **VALUE**: Verifies a failed ping takes the soft failure path.
///
/// **BUG THIS CATCHES**: Would catch ping errors being logged and ignored.
#[tokio::test(start_paused = true)]
async fn given_ping_fails_when_heartbeat_fires_then_reconnecting() {
    let harness = Harness::new();
    let server = harness.connect().await;
    server.probe.fail_pings.store(true, Ordering::SeqCst);

    sleep(Duration::from_secs(31)).await;

    assert_eq!(server.probe.pings.load(Ordering::SeqCst), 1);
    assert_eq!(harness.client.state(), ConnectionState::Reconnecting);
    assert!(matches!(
        harness.client.last_failure(),
        Some(GatewayError::NotConnected { .. })
    ));
}

/// **VALUE**: Verifies disconnect stops every timer deterministically.
///
/// **BUG THIS CATCHES**: Would catch a watchdog or heartbeat that outlives its
/// connection and flips a disconnected client to `Reconnecting`.
#[tokio::test(start_paused = true)]
async fn given_disconnected_when_time_passes_then_no_timer_fires() {
    let harness = Harness::new();
    let server = harness.connect().await;

    harness.client.disconnect().await;
    sleep(Duration::from_secs(200)).await;

    assert_eq!(server.probe.pings.load(Ordering::SeqCst), 0);
    assert_eq!(harness.client.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn given_reconnected_when_old_watchdog_would_fire_then_new_connection_survives() {
    // GIVEN: A first connection that is replaced after 30s
    let harness = Harness::new();
    let first = harness.connect().await;
    sleep(Duration::from_secs(30)).await;
    let second = harness.connect().await;

    // WHEN: The first connection's watchdog deadline (60s) passes
    sleep(Duration::from_secs(40)).await;

    // THEN
    assert_eq!(harness.client.state(), ConnectionState::Connected);
    assert!(harness.client.has_transport());
    assert_eq!(first.probe.close_codes(), vec![1001]);
    assert!(second.probe.close_codes().is_empty());
}
