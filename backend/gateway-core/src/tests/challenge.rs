use crate::client::test_support::ChallengeWaiter;

use tokio::sync::oneshot::error::TryRecvError;

/// **VALUE**: Verifies a nonce that arrives before anyone waits is buffered.
///
/// **WHY THIS MATTERS**: The gateway sends `connect.challenge` the moment the
/// socket opens, which can beat the connect attempt to registering its waiter.
///
/// **BUG THIS CATCHES**: Would catch a waiter that only forwards nonces to an
/// already-registered receiver, turning the race into a 6s handshake timeout.
#[test]
fn given_nonce_arrives_first_when_registering_then_receives_buffered_nonce() {
    // GIVEN
    let mut waiter = ChallengeWaiter::new();
    assert!(waiter.deliver("early".to_string()));

    // WHEN
    let mut receiver = waiter.register();

    // THEN
    assert_eq!(receiver.try_recv().unwrap(), "early");
}

#[test]
fn given_waiter_registered_first_when_nonce_arrives_then_waiter_receives_it() {
    let mut waiter = ChallengeWaiter::new();
    let mut receiver = waiter.register();
    assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));

    assert!(waiter.deliver("late".to_string()));

    assert_eq!(receiver.try_recv().unwrap(), "late");
}

#[test]
fn given_repeated_challenge_before_register_when_registering_then_latest_wins() {
    let mut waiter = ChallengeWaiter::new();
    waiter.deliver("first".to_string());
    waiter.deliver("second".to_string());

    let mut receiver = waiter.register();

    assert_eq!(receiver.try_recv().unwrap(), "second");
}

#[test]
fn given_nonce_consumed_when_another_arrives_then_it_is_ignored() {
    let mut waiter = ChallengeWaiter::new();
    let mut receiver = waiter.register();
    waiter.deliver("one".to_string());

    let accepted = waiter.deliver("two".to_string());

    assert!(!accepted);
    assert_eq!(receiver.try_recv().unwrap(), "one");
}

#[test]
fn given_registered_waiter_when_reset_then_receiver_sees_closed_channel() {
    let mut waiter = ChallengeWaiter::new();
    let mut receiver = waiter.register();

    waiter.reset();

    assert!(matches!(receiver.try_recv(), Err(TryRecvError::Closed)));
}

#[test]
fn given_buffered_nonce_when_reset_then_next_attempt_waits_for_fresh_nonce() {
    let mut waiter = ChallengeWaiter::new();
    waiter.deliver("stale".to_string());

    waiter.reset();
    let mut receiver = waiter.register();

    assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
}
