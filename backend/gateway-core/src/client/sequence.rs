//! Event sequence tracking.
//!
//! Only used to notice gaps. Delivery never waits on, reorders, or drops
//! events because of their sequence number.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SequenceCheck {
    First,
    InOrder,
    Gap { expected: u64, received: u64 },
    Behind { last: u64, received: u64 },
}

#[derive(Debug, Default)]
pub(crate) struct SequenceTracker {
    last_seq: Option<u64>,
}

impl SequenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reset(&mut self) {
        self.last_seq = None;
    }

    pub(crate) fn observe(&mut self, seq: u64) -> SequenceCheck {
        let check = match self.last_seq {
            None => SequenceCheck::First,
            Some(last) if seq == last.saturating_add(1) => SequenceCheck::InOrder,
            Some(last) if seq > last => SequenceCheck::Gap {
                expected: last + 1,
                received: seq,
            },
            Some(last) => SequenceCheck::Behind {
                last,
                received: seq,
            },
        };

        self.last_seq = Some(seq);
        check
    }
}
