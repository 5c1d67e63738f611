//! Single-slot rendezvous for the `connect.challenge` nonce.
//!
//! The nonce may arrive before the connect attempt starts waiting for it, or
//! after. Either way exactly one waiter receives it.

use log::debug;
use tokio::sync::oneshot;

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Waiting(oneshot::Sender<String>),
    Arrived(String),
    Consumed,
}

#[derive(Debug, Default)]
pub(crate) struct ChallengeWaiter {
    slot: Slot,
}

impl ChallengeWaiter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Forget any buffered nonce and drop any registered waiter.
    ///
    /// A dropped waiter observes a closed channel.
    pub(crate) fn reset(&mut self) {
        self.slot = Slot::Empty;
    }

    /// Wait for the nonce, resolving immediately if it already arrived.
    pub(crate) fn register(&mut self) -> oneshot::Receiver<String> {
        let (sender, receiver) = oneshot::channel();

        match std::mem::take(&mut self.slot) {
            Slot::Arrived(nonce) => {
                // The receiver is still in hand, so this cannot fail.
                let _ = sender.send(nonce);
                self.slot = Slot::Consumed;
            }
            Slot::Empty | Slot::Waiting(_) | Slot::Consumed => {
                self.slot = Slot::Waiting(sender);
            }
        }

        receiver
    }

    /// Hand a nonce to the waiter, or buffer it until one registers.
    ///
    /// Returns `false` when the nonce was not used: the attempt already
    /// consumed one, or its waiter has gone away.
    pub(crate) fn deliver(&mut self, nonce: String) -> bool {
        match std::mem::take(&mut self.slot) {
            Slot::Waiting(sender) => {
                self.slot = Slot::Consumed;
                sender.send(nonce).is_ok()
            }
            Slot::Arrived(previous) => {
                debug!("Replacing buffered challenge nonce ({} chars)", previous.len());
                self.slot = Slot::Arrived(nonce);
                true
            }
            Slot::Empty => {
                self.slot = Slot::Arrived(nonce);
                true
            }
            Slot::Consumed => {
                self.slot = Slot::Consumed;
                false
            }
        }
    }
}
