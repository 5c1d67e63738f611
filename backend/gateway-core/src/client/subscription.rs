use crate::client::coordinator::ClientInner;
use crate::client::fanout::GatewayEvent;

use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

/// A caller's view of the gateway event stream.
///
/// Survives transient connection loss: events resume after the next
/// successful `connect`. The stream ends on an explicit `disconnect`.
/// Dropping the subscription deregisters it immediately.
pub struct EventSubscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<GatewayEvent>,
    client: Weak<ClientInner>,
}

impl EventSubscription {
    pub(crate) fn new(
        id: u64,
        receiver: mpsc::UnboundedReceiver<GatewayEvent>,
        client: Weak<ClientInner>,
    ) -> Self {
        Self {
            id,
            receiver,
            client,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next event, or `None` once the client was explicitly disconnected.
    pub async fn recv(&mut self) -> Option<GatewayEvent> {
        self.receiver.recv().await
    }

    /// Stop receiving events.
    pub fn cancel(self) {}
}

impl Stream for EventSubscription {
    type Item = GatewayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(client) = self.client.upgrade() {
            client.unsubscribe(self.id);
        }
    }
}
