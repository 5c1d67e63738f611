//! Gateway RPC client.
//!
//! [`GatewayClient`] keeps one persistent connection to the gateway and
//! offers:
//!
//! - a challenge-signed `connect` handshake
//! - concurrent requests, each with its own timeout
//! - server-pushed events fanned out to any number of subscribers
//! - a heartbeat ping and a watchdog for connections that die silently
//!
//! There is no reconnect loop in here. Callers watch [`ConnectionState`] and
//! call [`GatewayClient::connect`] again when they see `Reconnecting`.

mod challenge;
mod coordinator;
mod correlator;
mod dispatch;
mod fanout;
mod keepalive;
mod sequence;
mod state;
mod subscription;

pub use fanout::GatewayEvent;
pub use keepalive::staleness_threshold;
pub use state::ConnectionState;
pub use subscription::EventSubscription;

use crate::client::coordinator::ClientInner;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::identity::DeviceIdentitySigner;
use crate::transport::{TransportConnector, WebSocketConnector};

use common::RedactedToken;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

/// Handle to one gateway connection. Clones share the same connection.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<ClientInner>,
}

impl GatewayClient {
    pub fn new(
        config: GatewayConfig,
        connector: Arc<dyn TransportConnector>,
        signer: Arc<dyn DeviceIdentitySigner>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner::new(config, connector, signer)),
        }
    }

    /// Client backed by real WebSocket connections.
    pub fn websocket(config: GatewayConfig, signer: Arc<dyn DeviceIdentitySigner>) -> Self {
        Self::new(config, Arc::new(WebSocketConnector), signer)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    // ============================================
    // LIFECYCLE
    // ============================================

    /// Open, authenticate and start keepalive for a connection to `url`.
    ///
    /// `url` may be `http(s)://` or `ws(s)://`; its path is ignored. Any live
    /// connection is replaced first, keeping event subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConnectionFailed`] when the transport cannot be
    /// opened, no challenge arrives in time, or signing fails. Errors from the
    /// `connect` request itself are returned unchanged. The client is left
    /// `Disconnected` on every error.
    pub async fn connect(&self, url: &str, token: Option<&RedactedToken>) -> Result<(), GatewayError> {
        self.inner.connect(url, token).await
    }

    /// Close the connection, fail pending requests and end every event stream.
    ///
    /// Safe to call any number of times.
    pub async fn disconnect(&self) {
        self.inner.disconnect().await;
    }

    // ============================================
    // REQUESTS
    // ============================================

    /// Send `method` with the configured default timeout.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        let timeout = self.inner.config.timeouts.request();
        self.request_with_timeout(method, params, timeout).await
    }

    /// # Errors
    ///
    /// - [`GatewayError::NotConnected`] unless connected, or if the
    ///   connection drops before the response arrives
    /// - [`GatewayError::Timeout`] when no response arrives within `timeout`
    /// - [`GatewayError::RequestFailed`] when the gateway answers `ok: false`
    pub async fn request_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        self.inner.call(None, method, params, timeout).await
    }

    /// Like [`request`](Self::request), decoding the payload into `T`.
    pub async fn request_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, GatewayError> {
        let payload = self.request(method, params).await?;

        serde_json::from_value(payload).map_err(|e| {
            GatewayError::invalid_response(format!("Unexpected {method} payload: {e}"))
        })
    }

    // ============================================
    // EVENTS
    // ============================================

    /// Register a new independent event subscriber.
    pub fn events(&self) -> EventSubscription {
        let (id, receiver) = self.inner.shared.lock().fanout.subscribe();
        EventSubscription::new(id, receiver, Arc::downgrade(&self.inner))
    }

    // ============================================
    // STATE
    // ============================================

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.watch_state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn is_reconnecting(&self) -> bool {
        self.state() == ConnectionState::Reconnecting
    }

    /// Why the connection was last lost or the last `connect` failed.
    ///
    /// Cleared when a new `connect` starts and by `disconnect`.
    pub fn last_failure(&self) -> Option<GatewayError> {
        self.inner.last_failure()
    }

    /// Tick interval negotiated by the last successful connect.
    pub fn tick_interval(&self) -> Duration {
        self.inner.tick_interval()
    }

    pub fn pending_request_count(&self) -> usize {
        self.inner.shared.lock().correlator.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.shared.lock().fanout.len()
    }

    pub fn has_transport(&self) -> bool {
        self.inner.has_transport()
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("state", &self.state())
            .field("pending_requests", &self.pending_request_count())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    pub(crate) use super::challenge::ChallengeWaiter;
    pub(crate) use super::coordinator::FailureCause;
    pub(crate) use super::correlator::RequestCorrelator;
    pub(crate) use super::fanout::EventFanout;
    pub(crate) use super::sequence::{SequenceCheck, SequenceTracker};
}
