// Unit tests for liveness thresholds and failure classification

use crate::client::staleness_threshold;
use crate::client::test_support::FailureCause;
use crate::error::{GatewayError, TransportError};
use crate::transport::CloseInfo;

use std::time::Duration;

#[test]
fn given_default_tick_when_computing_threshold_then_twice_the_tick() {
    assert_eq!(
        staleness_threshold(Duration::from_millis(30_000)),
        Duration::from_millis(60_000)
    );
}

/// **VALUE**: Verifies tiny tick intervals are clamped to one second.
///
/// **BUG THIS CATCHES**: A gateway advertising `tickIntervalMs: 1` would
/// otherwise have the watchdog kill a healthy connection every 2ms.
#[test]
fn given_tiny_tick_when_computing_threshold_then_clamped_to_two_seconds() {
    assert_eq!(
        staleness_threshold(Duration::from_millis(1)),
        Duration::from_millis(2_000)
    );
    assert_eq!(
        staleness_threshold(Duration::from_millis(1_000)),
        Duration::from_millis(2_000)
    );
}

/// **VALUE**: Verifies only a policy-violation close with a reason becomes
/// `ConnectionFailed`.
///
/// **WHY THIS MATTERS**: That is how the gateway says "your token was revoked".
/// The reason has to reach the user; every other loss is just `NotConnected`.
#[test]
fn given_policy_violation_with_reason_when_classified_then_connection_failed() {
    // GIVEN
    let cause = FailureCause::Closed(CloseInfo {
        code: Some(1008),
        reason: Some("device not paired".to_string()),
    });

    // WHEN
    let error = cause.classify();

    // THEN
    assert!(matches!(error, GatewayError::ConnectionFailed { .. }));
    assert_eq!(error.detail(), Some("device not paired"));
}

#[test]
fn given_other_failures_when_classified_then_not_connected() {
    let causes = [
        FailureCause::Closed(CloseInfo {
            code: Some(1008),
            reason: None,
        }),
        FailureCause::Closed(CloseInfo {
            code: Some(1008),
            reason: Some("  ".to_string()),
        }),
        FailureCause::Closed(CloseInfo {
            code: Some(1000),
            reason: Some("bye".to_string()),
        }),
        FailureCause::Closed(CloseInfo::default()),
        FailureCause::Transport(TransportError::receive("reset by peer")),
        FailureCause::Stale {
            elapsed: Duration::from_secs(61),
        },
    ];

    for cause in causes {
        let error = cause.classify();

        assert!(
            matches!(error, GatewayError::NotConnected { .. }),
            "{cause} should be NotConnected, got {error:?}"
        );
    }
}
