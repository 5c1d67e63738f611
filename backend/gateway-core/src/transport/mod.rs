//! Transport abstraction over one framed, bidirectional message channel.
//!
//! The client never touches a socket directly. It opens a [`Transport`]
//! through a [`TransportConnector`] and then only:
//!
//! - sends text frames
//! - receives frames from a single receive loop
//! - pings for liveness
//! - closes with a WebSocket close code
//!
//! [`WebSocketConnector`] is the production implementation. Tests plug in
//! in-memory connectors through the same traits.

mod endpoint;
mod websocket;

pub use endpoint::websocket_url;
pub use websocket::{WebSocketConnector, WebSocketTransport};

use crate::error::TransportError;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

/// Close details reported by the remote side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: Option<u16>,
    pub reason: Option<String>,
}

/// One inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    Text(String),
    Binary(Vec<u8>),
    Closed(CloseInfo),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the channel is closed.
    async fn send(&self, text: String) -> Result<(), TransportError>;

    /// Next inbound frame; `None` once the channel has ended.
    ///
    /// Only one task may drive this at a time.
    async fn receive(&self) -> Option<Result<TransportFrame, TransportError>>;

    async fn ping(&self) -> Result<(), TransportError>;

    async fn close(&self, code: u16);
}

#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn open(&self, url: &Url) -> Result<Arc<dyn Transport>, TransportError>;
}
