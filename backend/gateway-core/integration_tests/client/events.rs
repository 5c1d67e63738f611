use crate::client::helpers::{Harness, WAIT};

use gateway_core::{ConnectionState, GatewayEvent};

use futures_util::StreamExt;
use serde_json::json;
use tokio::time::timeout;

async fn next_event(events: &mut gateway_core::EventSubscription) -> GatewayEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("Timed out waiting for an event")
        .expect("Event stream ended")
}

#[tokio::test]
async fn given_two_subscribers_when_gateway_pushes_then_both_receive_in_order() {
    // GIVEN
    let harness = Harness::new();
    let server = harness.connect().await;
    let mut first = harness.client.events();
    let mut second = harness.client.events();
    assert_ne!(first.id(), second.id());

    // WHEN
    server.send_event("agent", json!({"step": 1}), Some(1));
    server.send_event("agent", json!({"step": 2}), Some(2));

    // THEN
    for events in [&mut first, &mut second] {
        assert_eq!(next_event(events).await.payload, json!({"step": 1}));
        assert_eq!(next_event(events).await.payload, json!({"step": 2}));
    }
}

#[tokio::test]
async fn given_subscription_when_used_as_stream_then_yields_events() {
    let harness = Harness::new();
    let server = harness.connect().await;
    let mut events = harness.client.events();

    server.send_event("presence", json!({"who": "ops"}), None);

    let event = timeout(WAIT, events.next()).await.unwrap().unwrap();
    assert_eq!(event.event, "presence");
    assert_eq!(event.seq, None);
}

#[tokio::test]
async fn given_event_with_negative_seq_when_received_then_delivered_without_seq() {
    let harness = Harness::new();
    let server = harness.connect().await;
    let mut events = harness.client.events();

    server.send_json(json!({"type": "event", "event": "agent", "payload": {"step": 1}, "seq": -4}));

    let event = next_event(&mut events).await;
    assert_eq!(event.payload, json!({"step": 1}));
    assert_eq!(event.seq, None);
}

/// **VALUE**: Verifies garbage on the wire is dropped without hurting the
/// connection.
///
/// **BUG THIS CATCHES**: Would catch a decode error ending the receive loop,
/// which leaves the client `Connected` but deaf.
#[tokio::test]
async fn given_malformed_frames_when_received_then_dropped_and_later_events_delivered() {
    // GIVEN
    let harness = Harness::new();
    let server = harness.connect().await;
    let mut events = harness.client.events();

    // WHEN
    server.send_text("{not json");
    server.send_text("[1, 2, 3]");
    server.send_text(r#"{"event":"no-type"}"#);
    server.send_binary(vec![0xff, 0xfe, 0xfd]);
    server.send_text(r#"{"type":"res","id":"nobody-asked","ok":true}"#);
    server.send_text(r#"{"type":"req","id":"x","method":"server.push"}"#);
    server.send_event("agent", json!({"after": "garbage"}), None);

    // THEN
    let event = next_event(&mut events).await;
    assert_eq!(event.payload, json!({"after": "garbage"}));
    assert_eq!(harness.client.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn given_binary_json_frame_when_received_then_dispatched_like_text() {
    let harness = Harness::new();
    let server = harness.connect().await;
    let mut events = harness.client.events();

    let frame = json!({"type": "event", "event": "binary", "payload": {}}).to_string();
    server.send_binary(frame.into_bytes());

    assert_eq!(next_event(&mut events).await.event, "binary");
}

#[tokio::test]
async fn given_sequence_gap_when_received_then_events_still_delivered() {
    let harness = Harness::new();
    let server = harness.connect().await;
    let mut events = harness.client.events();

    server.send_event("tick", json!({}), Some(1));
    server.send_event("tick", json!({}), Some(5));
    server.send_event("tick", json!({}), Some(3));

    assert_eq!(next_event(&mut events).await.seq, Some(1));
    assert_eq!(next_event(&mut events).await.seq, Some(5));
    assert_eq!(next_event(&mut events).await.seq, Some(3));
}

#[tokio::test]
async fn given_repeated_challenge_when_connected_then_not_broadcast() {
    let harness = Harness::new();
    let server = harness.connect().await;
    let mut events = harness.client.events();

    server.send_challenge("late-nonce");
    server.send_event("agent", json!({}), None);

    assert_eq!(next_event(&mut events).await.event, "agent");
    assert!(harness.client.is_connected());
}

/// **VALUE**: Verifies subscribers survive a transient connection loss and
/// resume after the next `connect`.
///
/// **WHY THIS MATTERS**: Dashboard panels subscribe once. A network blip must
/// not silently orphan them.
///
/// **BUG THIS CATCHES**: Would catch a transport failure that finishes
/// subscriber streams the way an explicit disconnect does.
#[tokio::test]
async fn given_transport_failure_when_reconnected_then_existing_subscriber_resumes() {
    // GIVEN: A subscriber on a live connection
    let harness = Harness::new();
    let mut first = harness.connect().await;
    let mut events = harness.client.events();
    let mut state = harness.client.watch_state();

    // WHEN: The connection drops without a close frame
    first.hang_up();
    timeout(WAIT, state.wait_for(|state| *state == ConnectionState::Reconnecting))
        .await
        .unwrap()
        .unwrap();

    // THEN: The subscriber is still registered
    assert_eq!(harness.client.subscriber_count(), 1);
    assert!(!harness.client.has_transport());
    assert_eq!(first.probe.close_codes(), vec![1001]);

    // AND: Events from the next connection reach it without re-subscribing
    let second = harness.connect().await;
    second.send_event("agent", json!({"resumed": true}), Some(1));
    assert_eq!(next_event(&mut events).await.payload, json!({"resumed": true}));
}

#[tokio::test]
async fn given_subscription_dropped_when_counting_then_deregistered() {
    let harness = Harness::new();
    let _server = harness.connect().await;
    let events = harness.client.events();
    let other = harness.client.events();
    assert_eq!(harness.client.subscriber_count(), 2);

    drop(events);
    other.cancel();

    assert_eq!(harness.client.subscriber_count(), 0);
}

#[tokio::test]
async fn given_subscribed_before_connect_when_connected_then_receives_events() {
    let harness = Harness::new();
    let mut events = harness.client.events();

    let server = harness.connect().await;
    server.send_event("presence", json!({}), None);

    assert_eq!(next_event(&mut events).await.event, "presence");
}
