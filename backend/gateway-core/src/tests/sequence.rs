use crate::client::test_support::{SequenceCheck, SequenceTracker};

#[test]
fn given_fresh_tracker_when_observing_then_first_then_in_order() {
    let mut tracker = SequenceTracker::new();

    assert_eq!(tracker.observe(10), SequenceCheck::First);
    assert_eq!(tracker.observe(11), SequenceCheck::InOrder);
    assert_eq!(tracker.observe(12), SequenceCheck::InOrder);
}

/// **VALUE**: Verifies a skipped sequence number is reported with what was missed.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one that flags every in-order
/// event as a gap and floods the log.
#[test]
fn given_skipped_numbers_when_observing_then_gap_reported() {
    let mut tracker = SequenceTracker::new();
    tracker.observe(1);

    let check = tracker.observe(5);

    assert_eq!(
        check,
        SequenceCheck::Gap {
            expected: 2,
            received: 5
        }
    );
    assert_eq!(tracker.observe(6), SequenceCheck::InOrder);
}

#[test]
fn given_older_number_when_observing_then_behind_and_tracking_follows_it() {
    let mut tracker = SequenceTracker::new();
    tracker.observe(7);

    assert_eq!(
        tracker.observe(3),
        SequenceCheck::Behind {
            last: 7,
            received: 3
        }
    );
    assert_eq!(tracker.observe(4), SequenceCheck::InOrder);
}

#[test]
fn given_reset_when_observing_then_starts_over() {
    let mut tracker = SequenceTracker::new();
    tracker.observe(100);

    tracker.reset();

    assert_eq!(tracker.observe(1), SequenceCheck::First);
}
