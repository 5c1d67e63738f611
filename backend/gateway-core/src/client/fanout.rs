//! Event distribution to independent subscribers.

use crate::protocol::EventFrame;

use std::collections::HashMap;

use log::debug;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// A server-pushed event as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayEvent {
    pub event: String,
    pub payload: Value,
    pub seq: Option<u64>,
}

impl From<EventFrame> for GatewayEvent {
    fn from(frame: EventFrame) -> Self {
        Self {
            event: frame.event,
            payload: frame.payload,
            seq: frame.seq,
        }
    }
}

/// Subscriber registry.
///
/// Sinks are unbounded so a slow or absent consumer never stalls the receive
/// loop.
#[derive(Debug, Default)]
pub(crate) struct EventFanout {
    subscribers: HashMap<u64, mpsc::UnboundedSender<GatewayEvent>>,
    next_id: u64,
}

impl EventFanout {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&mut self) -> (u64, mpsc::UnboundedReceiver<GatewayEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        self.next_id += 1;
        let id = self.next_id;
        self.subscribers.insert(id, sender);
        debug!("Event subscriber {} registered ({} active)", id, self.subscribers.len());

        (id, receiver)
    }

    pub(crate) fn unsubscribe(&mut self, id: u64) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            debug!("Event subscriber {} removed ({} active)", id, self.subscribers.len());
        }
        removed
    }

    /// Push an event to every live subscriber, pruning ones whose receiver is gone.
    ///
    /// Returns how many subscribers received it.
    pub(crate) fn broadcast(&mut self, event: &GatewayEvent) -> usize {
        let mut delivered = 0;

        self.subscribers.retain(|id, sender| {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                debug!("Event subscriber {} went away", id);
                false
            }
        });

        delivered
    }

    /// End every subscriber stream.
    pub(crate) fn finish_all(&mut self) -> usize {
        let count = self.subscribers.len();
        self.subscribers.clear();
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}
