// Unit tests for pending request correlation

use crate::client::test_support::RequestCorrelator;
use crate::error::GatewayError;

use serde_json::json;

#[test]
fn given_pending_request_when_resolved_then_caller_gets_payload_and_timeout_cancelled() {
    // GIVEN
    let mut correlator = RequestCorrelator::new();
    let (mut receiver, timeout) = correlator.register("a".to_string(), "health");

    // WHEN
    let resolved = correlator.resolve("a", Ok(json!({"ok": 1})));

    // THEN
    assert!(resolved);
    assert!(timeout.is_cancelled());
    assert_eq!(receiver.try_recv().unwrap().unwrap(), json!({"ok": 1}));
    assert_eq!(correlator.len(), 0);
}

/// **VALUE**: Verifies an id resolves exactly once no matter who gets there first.
///
/// **WHY THIS MATTERS**: A response and a timeout can race for the same id.
/// The loser must be a silent no-op.
///
/// **BUG THIS CATCHES**: Would catch resolving before removing the entry, which
/// lets the second resolver overwrite or panic on a spent channel.
#[test]
fn given_request_timed_out_when_late_response_arrives_then_it_is_ignored() {
    // GIVEN: A request that already timed out
    let mut correlator = RequestCorrelator::new();
    let (mut receiver, _timeout) = correlator.register("a".to_string(), "slow");
    assert!(correlator.resolve("a", Err(GatewayError::timeout())));

    // WHEN: The response finally shows up
    let late = correlator.resolve("a", Ok(json!("late")));

    // THEN: Caller saw only the timeout
    assert!(!late);
    assert!(matches!(
        receiver.try_recv().unwrap(),
        Err(GatewayError::Timeout { .. })
    ));
}

#[test]
fn given_unknown_id_when_resolved_then_returns_false() {
    let mut correlator = RequestCorrelator::new();

    assert!(!correlator.resolve("never-sent", Ok(json!(null))));
}

#[test]
fn given_many_pending_when_fail_all_then_each_gets_same_error_once() {
    // GIVEN
    let mut correlator = RequestCorrelator::new();
    let mut pending: Vec<_> = (0..3)
        .map(|index| correlator.register(format!("id-{index}"), "m"))
        .collect();

    // WHEN
    let failed = correlator.fail_all(&GatewayError::not_connected());

    // THEN
    assert_eq!(failed, 3);
    assert_eq!(correlator.len(), 0);
    for (receiver, timeout) in pending.iter_mut() {
        assert!(timeout.is_cancelled());
        assert!(matches!(
            receiver.try_recv().unwrap(),
            Err(GatewayError::NotConnected { .. })
        ));
    }
    assert!(!correlator.resolve("id-0", Ok(json!(1))));
}

#[test]
fn given_caller_stopped_waiting_when_resolved_then_entry_still_removed() {
    let mut correlator = RequestCorrelator::new();
    let (receiver, _timeout) = correlator.register("a".to_string(), "m");
    drop(receiver);

    assert!(correlator.resolve("a", Ok(json!(1))));
    assert_eq!(correlator.len(), 0);
}

#[test]
fn given_two_requests_when_resolved_out_of_order_then_each_gets_its_own() {
    let mut correlator = RequestCorrelator::new();
    let (mut first, _) = correlator.register("first".to_string(), "echo");
    let (mut second, _) = correlator.register("second".to_string(), "echo");

    correlator.resolve("second", Ok(json!(2)));
    correlator.resolve("first", Ok(json!(1)));

    assert_eq!(first.try_recv().unwrap().unwrap(), json!(1));
    assert_eq!(second.try_recv().unwrap().unwrap(), json!(2));
}
