//! tokio-tungstenite implementation of [`Transport`].

use crate::error::TransportError;
use crate::transport::{CloseInfo, Transport, TransportConnector, TransportFrame};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens [`WebSocketTransport`]s with `connect_async`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl TransportConnector for WebSocketConnector {
    async fn open(&self, url: &Url) -> Result<Arc<dyn Transport>, TransportError> {
        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::connect(format!("WebSocket connect to {url} failed: {e}")))?;

        info!("WebSocket opened to {}", url);

        Ok(Arc::new(WebSocketTransport::new(ws_stream)))
    }
}

/// One open WebSocket, split so sends never wait behind the receive loop.
pub struct WebSocketTransport {
    write: Mutex<SplitSink<WsStream, Message>>,
    read: Mutex<SplitStream<WsStream>>,
    closed: AtomicBool,
}

impl WebSocketTransport {
    pub fn new(ws_stream: WsStream) -> Self {
        let (write, read) = ws_stream.split();
        Self {
            write: Mutex::new(write),
            read: Mutex::new(read),
            closed: AtomicBool::new(false),
        }
    }

    fn map_write_error(&self, error: WsError, to_error: fn(String) -> TransportError) -> TransportError {
        match error {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                self.closed.store(true, Ordering::SeqCst);
                TransportError::closed()
            }
            other => to_error(other.to_string()),
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::closed());
        }

        let mut write = self.write.lock().await;
        write
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| self.map_write_error(e, |message| TransportError::send(message)))
    }

    async fn receive(&self) -> Option<Result<TransportFrame, TransportError>> {
        let mut read = self.read.lock().await;

        loop {
            let message = match read.next().await? {
                Ok(message) => message,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                    self.closed.store(true, Ordering::SeqCst);
                    return None;
                }
                Err(e) => {
                    self.closed.store(true, Ordering::SeqCst);
                    return Some(Err(TransportError::receive(e.to_string())));
                }
            };

            match message {
                Message::Text(text) => {
                    return Some(Ok(TransportFrame::Text(text.as_str().to_owned())));
                }
                Message::Binary(bytes) => return Some(Ok(TransportFrame::Binary(bytes.to_vec()))),
                Message::Close(frame) => {
                    self.closed.store(true, Ordering::SeqCst);
                    let info = frame
                        .map(|frame| CloseInfo {
                            code: Some(u16::from(frame.code)),
                            reason: Some(frame.reason.as_str().to_owned())
                                .filter(|reason| !reason.is_empty()),
                        })
                        .unwrap_or_default();
                    return Some(Ok(TransportFrame::Closed(info)));
                }
                // Control frames are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn ping(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::closed());
        }

        let mut write = self.write.lock().await;
        write
            .send(Message::Ping(Vec::<u8>::new().into()))
            .await
            .map_err(|e| self.map_write_error(e, |message| TransportError::ping(message)))
    }

    async fn close(&self, code: u16) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("WebSocket already closed");
        }

        let mut write = self.write.lock().await;
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        if let Err(e) = write.send(Message::Close(Some(frame))).await {
            debug!("WebSocket close frame not sent: {}", e);
        }
        if let Err(e) = write.close().await {
            debug!("WebSocket sink close failed: {}", e);
        }
    }
}
