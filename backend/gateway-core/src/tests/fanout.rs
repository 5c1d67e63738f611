use crate::client::GatewayEvent;
use crate::client::test_support::EventFanout;
use crate::protocol::EventFrame;

use serde_json::json;

fn event(name: &str, seq: u64) -> GatewayEvent {
    GatewayEvent::from(EventFrame {
        event: name.to_string(),
        payload: json!({"n": seq}),
        seq: Some(seq),
    })
}

/// **VALUE**: Verifies every subscriber gets its own copy of each event.
///
/// **WHY THIS MATTERS**: Several dashboard panels watch the same stream. A
/// shared receiver would hand each event to only one of them.
#[test]
fn given_two_subscribers_when_broadcasting_then_both_receive_in_order() {
    // GIVEN
    let mut fanout = EventFanout::new();
    let (_, mut first) = fanout.subscribe();
    let (_, mut second) = fanout.subscribe();

    // WHEN
    fanout.broadcast(&event("agent", 1));
    let delivered = fanout.broadcast(&event("agent", 2));

    // THEN
    assert_eq!(delivered, 2);
    for receiver in [&mut first, &mut second] {
        assert_eq!(receiver.try_recv().unwrap().seq, Some(1));
        assert_eq!(receiver.try_recv().unwrap().seq, Some(2));
    }
}

#[test]
fn given_subscriber_ids_when_subscribing_then_unique() {
    let mut fanout = EventFanout::new();

    let (first, _a) = fanout.subscribe();
    let (second, _b) = fanout.subscribe();

    assert_ne!(first, second);
    assert_eq!(fanout.len(), 2);
}

#[test]
fn given_unsubscribed_when_broadcasting_then_not_delivered() {
    let mut fanout = EventFanout::new();
    let (id, mut receiver) = fanout.subscribe();

    assert!(fanout.unsubscribe(id));
    let delivered = fanout.broadcast(&event("agent", 1));

    assert_eq!(delivered, 0);
    assert!(receiver.try_recv().is_err());
    assert!(!fanout.unsubscribe(id));
}

/// **BUG THIS CATCHES**: Would catch the registry keeping senders whose
/// receivers were dropped without an explicit unsubscribe.
#[test]
fn given_receiver_dropped_when_broadcasting_then_subscriber_pruned() {
    let mut fanout = EventFanout::new();
    let (_, receiver) = fanout.subscribe();
    let (_, mut alive) = fanout.subscribe();
    drop(receiver);

    let delivered = fanout.broadcast(&event("agent", 1));

    assert_eq!(delivered, 1);
    assert_eq!(fanout.len(), 1);
    assert!(alive.try_recv().is_ok());
}

#[test]
fn given_subscribers_when_finish_all_then_streams_end() {
    let mut fanout = EventFanout::new();
    let (_, mut receiver) = fanout.subscribe();
    fanout.broadcast(&event("agent", 1));

    let finished = fanout.finish_all();

    assert_eq!(finished, 1);
    assert_eq!(fanout.len(), 0);
    // Buffered events drain before the end of stream
    assert!(receiver.try_recv().is_ok());
    assert!(matches!(
        receiver.try_recv(),
        Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
    ));
}
