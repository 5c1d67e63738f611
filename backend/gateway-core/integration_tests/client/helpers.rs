//! Test helpers for gateway client integration tests.
//!
//! This module provides an in-memory gateway:
//! - `MockConnector` hands out one `MockTransport` per `connect`
//! - `ServerHandle` is the gateway's end of that transport
//! - `StaticSigner` stands in for the device identity keypair

use gateway_core::GatewayClient;
use gateway_core::config::GatewayConfig;
use gateway_core::error::TransportError;
use gateway_core::error::identity::IdentityError;
use gateway_core::identity::{DeviceAuthRequest, DeviceIdentitySigner, SignedDeviceAuth};
use gateway_core::transport::{CloseInfo, Transport, TransportConnector, TransportFrame};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::time::timeout;
use url::Url;

pub const GATEWAY_URL: &str = "http://127.0.0.1:18789/dashboard";
pub const TEST_NONCE: &str = "nonce-1";

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

type Inbound = Result<TransportFrame, TransportError>;

// ============================================
// TRANSPORT
// ============================================

/// What the client did to one transport.
#[derive(Default)]
pub struct TransportProbe {
    pub closed: AtomicBool,
    pub close_codes: Mutex<Vec<u16>>,
    pub pings: AtomicUsize,
    pub fail_pings: AtomicBool,
    pub fail_sends: AtomicBool,
    /// Sends never complete, like a socket stuck behind TCP backpressure.
    pub stall_sends: AtomicBool,
}

impl TransportProbe {
    pub fn close_codes(&self) -> Vec<u16> {
        self.close_codes.lock().clone()
    }
}

pub struct MockTransport {
    inbound: AsyncMutex<mpsc::UnboundedReceiver<Inbound>>,
    outbound: mpsc::UnboundedSender<String>,
    probe: Arc<TransportProbe>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, text: String) -> Result<(), TransportError> {
        if self.probe.closed.load(Ordering::SeqCst) {
            return Err(TransportError::closed());
        }
        if self.probe.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::send("connection reset"));
        }
        if self.probe.stall_sends.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        self.outbound
            .send(text)
            .map_err(|_| TransportError::closed())
    }

    async fn receive(&self) -> Option<Result<TransportFrame, TransportError>> {
        self.inbound.lock().await.recv().await
    }

    async fn ping(&self) -> Result<(), TransportError> {
        self.probe.pings.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail_pings.load(Ordering::SeqCst) {
            return Err(TransportError::ping("broken pipe"));
        }
        Ok(())
    }

    async fn close(&self, code: u16) {
        self.probe.closed.store(true, Ordering::SeqCst);
        self.probe.close_codes.lock().push(code);
    }
}

/// The gateway's side of one [`MockTransport`].
pub struct ServerHandle {
    pub url: Url,
    pub probe: Arc<TransportProbe>,
    to_client: Option<mpsc::UnboundedSender<Inbound>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerHandle {
    pub fn push(&self, inbound: Inbound) {
        if let Some(sender) = &self.to_client {
            // Receive loop may already be gone
            let _ = sender.send(inbound);
        }
    }

    pub fn send_json(&self, value: Value) {
        self.push(Ok(TransportFrame::Text(value.to_string())));
    }

    pub fn send_text(&self, text: &str) {
        self.push(Ok(TransportFrame::Text(text.to_string())));
    }

    pub fn send_binary(&self, bytes: Vec<u8>) {
        self.push(Ok(TransportFrame::Binary(bytes)));
    }

    pub fn send_challenge(&self, nonce: &str) {
        self.send_json(json!({
            "type": "event",
            "event": "connect.challenge",
            "payload": {"nonce": nonce}
        }));
    }

    pub fn send_event(&self, event: &str, payload: Value, seq: Option<u64>) {
        let mut frame = json!({"type": "event", "event": event, "payload": payload});
        if let Some(seq) = seq {
            frame["seq"] = json!(seq);
        }
        self.send_json(frame);
    }

    pub fn respond_ok(&self, id: &str, payload: Value) {
        self.send_json(json!({"type": "res", "id": id, "ok": true, "payload": payload}));
    }

    pub fn respond_error(&self, id: &str, message: &str) {
        self.send_json(json!({
            "type": "res",
            "id": id,
            "ok": false,
            "error": {"message": message}
        }));
    }

    pub fn close(&self, code: u16, reason: Option<&str>) {
        self.push(Ok(TransportFrame::Closed(CloseInfo {
            code: Some(code),
            reason: reason.map(str::to_string),
        })));
    }

    /// End the stream without a close frame.
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    /// Next frame the client sent, parsed.
    pub async fn next_frame(&mut self) -> Value {
        let text = timeout(WAIT, self.from_client.recv())
            .await
            .expect("Timed out waiting for a client frame")
            .expect("Client side of the transport is gone");
        serde_json::from_str(&text).expect("Client sent invalid JSON")
    }

    /// Next frame, asserted to be a request for `method`. Returns `(id, params)`.
    pub async fn expect_request(&mut self, method: &str) -> (String, Value) {
        let frame = self.next_frame().await;
        assert_eq!(frame["type"], "req", "Expected a request, got {frame}");
        assert_eq!(frame["method"], method, "Unexpected request {frame}");

        let id = frame["id"].as_str().expect("Request without id").to_string();
        (id, frame["params"].clone())
    }
}

pub struct MockConnector {
    pub fail_open: AtomicBool,
    opened: AtomicUsize,
    servers: mpsc::UnboundedSender<ServerHandle>,
    accepted: AsyncMutex<mpsc::UnboundedReceiver<ServerHandle>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        Arc::new(Self {
            fail_open: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
            servers: sender,
            accepted: AsyncMutex::new(receiver),
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Gateway side of the next transport the client opens.
    pub async fn next_server(&self) -> ServerHandle {
        let mut accepted = self.accepted.lock().await;
        timeout(WAIT, accepted.recv())
            .await
            .expect("Timed out waiting for the client to open a transport")
            .expect("Connector closed")
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn open(&self, url: &Url) -> Result<Arc<dyn Transport>, TransportError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(TransportError::connect("connection refused"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let probe = Arc::new(TransportProbe::default());

        let server = ServerHandle {
            url: url.clone(),
            probe: Arc::clone(&probe),
            to_client: Some(to_client),
            from_client,
        };
        self.servers
            .send(server)
            .map_err(|_| TransportError::connect("test gateway is gone"))?;

        Ok(Arc::new(MockTransport {
            inbound: AsyncMutex::new(inbound),
            outbound,
            probe,
        }))
    }
}

// ============================================
// IDENTITY
// ============================================

#[derive(Default)]
pub struct StaticSigner {
    pub fail: AtomicBool,
    pub last_request: Mutex<Option<DeviceAuthRequest>>,
}

impl DeviceIdentitySigner for StaticSigner {
    fn sign_connect(&self, request: &DeviceAuthRequest) -> Result<SignedDeviceAuth, IdentityError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IdentityError::signing("keychain locked"));
        }
        *self.last_request.lock() = Some(request.clone());

        Ok(SignedDeviceAuth {
            device_id: "device-test".to_string(),
            public_key: "public-key".to_string(),
            signature: format!("signed:{}", request.payload("device-test")),
            signed_at_ms: request.signed_at_ms,
            nonce: request.nonce.clone(),
        })
    }
}

// ============================================
// SETUP
// ============================================

pub struct Harness {
    pub client: GatewayClient,
    pub connector: Arc<MockConnector>,
    pub signer: Arc<StaticSigner>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(GatewayConfig::default())
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        let connector = MockConnector::new();
        let signer = Arc::new(StaticSigner::default());
        let client = GatewayClient::new(config, connector.clone(), signer.clone());

        Self {
            client,
            connector,
            signer,
        }
    }

    /// Run a full handshake answering `connect` with `hello`.
    pub async fn connect_with_hello(&self, hello: Value) -> ServerHandle {
        let connecting = {
            let client = self.client.clone();
            tokio::spawn(async move { client.connect(GATEWAY_URL, None).await })
        };

        let mut server = self.connector.next_server().await;
        server.send_challenge(TEST_NONCE);
        let (id, _params) = server.expect_request("connect").await;
        server.respond_ok(&id, hello);

        timeout(WAIT, connecting)
            .await
            .expect("Timed out waiting for connect")
            .expect("Connect task panicked")
            .expect("Connect failed");
        server
    }

    pub async fn connect(&self) -> ServerHandle {
        self.connect_with_hello(json!({"policy": {"tickIntervalMs": 30_000}}))
            .await
    }
}
