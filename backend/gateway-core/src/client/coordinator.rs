//! Connection coordinator.
//!
//! Owns the one mutable [`SharedState`] of a client and drives the
//! connect → authenticate → connected / reconnecting / disconnected lifecycle.
//!
//! # Architecture
//!
//! - A single `parking_lot::Mutex` serializes every mutation of connection
//!   state, pending requests, subscribers, the challenge slot and the sequence
//!   tracker. The lock is never held across an `.await`.
//! - Each opened transport gets a *generation* number and a
//!   [`CancellationToken`]. Background tasks (receive loop, heartbeat,
//!   watchdog) carry both: the token stops them at teardown, the generation
//!   stops a task that lost that race from touching a newer connection.
//! - Background tasks hold a `Weak` reference, so dropping the last client
//!   handle tears everything down.
//!
//! # Soft vs. hard teardown
//!
//! A transport failure tears down the transport, pending requests and timers
//! but keeps event subscribers. Only [`ClientInner::disconnect`] ends them.

use crate::client::challenge::ChallengeWaiter;
use crate::client::correlator::RequestCorrelator;
use crate::client::dispatch::receive_loop;
use crate::client::fanout::EventFanout;
use crate::client::keepalive::{heartbeat_loop, watchdog_loop};
use crate::client::sequence::SequenceTracker;
use crate::client::state::ConnectionState;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, TransportError};
use crate::identity::{DeviceAuthRequest, DeviceIdentitySigner};
use crate::protocol::{
    CONNECT_METHOD, ConnectParams, DEFAULT_TICK_INTERVAL_MS, GOING_AWAY_CLOSE_CODE,
    NORMAL_CLOSE_CODE, POLICY_VIOLATION_CLOSE_CODE, encode_request, tick_interval_from_hello,
};
use crate::transport::{CloseInfo, Transport, TransportConnector, websocket_url};

use common::RedactedToken;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::spawn as TokioSpawn;
use tokio::sync::oneshot::error::RecvError;
use tokio::sync::watch;
use tokio::time::{Instant, sleep as TokioSleep, timeout as TokioTimeout};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const CHALLENGE_TIMEOUT_REASON: &str = "Timed out waiting for connect.challenge";
const HANDSHAKE_CLOSED_REASON: &str = "Connection closed during handshake";

/// Why a live transport stopped being usable.
#[derive(Debug, Clone)]
pub(crate) enum FailureCause {
    Closed(CloseInfo),
    Transport(TransportError),
    Stale { elapsed: Duration },
}

impl FailureCause {
    /// Error delivered to pending requests and recorded as the last failure.
    ///
    /// Only a policy-violation close that carries a reason is surfaced as
    /// `ConnectionFailed`; everything else is `NotConnected`.
    pub(crate) fn classify(&self) -> GatewayError {
        match self {
            FailureCause::Closed(CloseInfo {
                code: Some(POLICY_VIOLATION_CLOSE_CODE),
                reason: Some(reason),
            }) if !reason.trim().is_empty() => GatewayError::connection_failed(reason.trim()),
            _ => GatewayError::not_connected(),
        }
    }
}

impl Display for FailureCause {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            FailureCause::Closed(CloseInfo { code, reason }) => write!(
                formatter,
                "closed by gateway (code {}, reason {:?})",
                code.map(|code| code.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                reason.as_deref().unwrap_or("")
            ),
            FailureCause::Transport(error) => write!(formatter, "transport error: {error}"),
            FailureCause::Stale { elapsed } => {
                write!(formatter, "no inbound frames for {elapsed:?}")
            }
        }
    }
}

struct ActiveConnection {
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

pub(crate) struct SharedState {
    pub(crate) state: ConnectionState,
    pub(crate) generation: u64,
    connection: Option<ActiveConnection>,
    pub(crate) correlator: RequestCorrelator,
    pub(crate) fanout: EventFanout,
    pub(crate) challenge: ChallengeWaiter,
    pub(crate) sequence: SequenceTracker,
    pub(crate) last_inbound: Instant,
    tick_interval: Duration,
    last_failure: Option<GatewayError>,
}

impl SharedState {
    fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            generation: 0,
            connection: None,
            correlator: RequestCorrelator::new(),
            fanout: EventFanout::new(),
            challenge: ChallengeWaiter::new(),
            sequence: SequenceTracker::new(),
            last_inbound: Instant::now(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            last_failure: None,
        }
    }

    /// True while `generation` still names the open transport.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.connection.is_some()
    }

    /// Stop every task and pending request of the open transport.
    ///
    /// Subscribers are left alone. Returns the transport so the caller can
    /// close it after releasing the lock.
    fn teardown(&mut self, error: &GatewayError) -> Option<Arc<dyn Transport>> {
        let failed = self.correlator.fail_all(error);
        if failed > 0 {
            info!(
                "Failed {} pending request(s) with {}",
                failed,
                error.error_category()
            );
        }
        self.challenge.reset();

        let connection = self.connection.take()?;
        connection.cancel.cancel();
        Some(connection.transport)
    }
}

pub(crate) struct ClientInner {
    pub(crate) config: GatewayConfig,
    connector: Arc<dyn TransportConnector>,
    signer: Arc<dyn DeviceIdentitySigner>,
    pub(crate) shared: Mutex<SharedState>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ClientInner {
    pub(crate) fn new(
        config: GatewayConfig,
        connector: Arc<dyn TransportConnector>,
        signer: Arc<dyn DeviceIdentitySigner>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            connector,
            signer,
            shared: Mutex::new(SharedState::new()),
            state_tx,
        }
    }

    // ============================================
    // OBSERVATION
    // ============================================

    pub(crate) fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub(crate) fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn last_failure(&self) -> Option<GatewayError> {
        self.shared.lock().last_failure.clone()
    }

    pub(crate) fn tick_interval(&self) -> Duration {
        self.shared.lock().tick_interval
    }

    pub(crate) fn has_transport(&self) -> bool {
        self.shared.lock().connection.is_some()
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        self.shared.lock().fanout.unsubscribe(id);
    }

    /// Time since the last inbound frame, while `generation` is current.
    pub(crate) fn elapsed_since_inbound(&self, generation: u64) -> Option<Duration> {
        let shared = self.shared.lock();
        shared
            .is_current(generation)
            .then(|| shared.last_inbound.elapsed())
    }

    fn transition(&self, shared: &mut SharedState, next: ConnectionState) {
        if shared.state == next {
            return;
        }

        info!("Gateway connection {} -> {}", shared.state, next);
        shared.state = next;
        self.state_tx.send_replace(next);
    }

    // ============================================
    // CONNECT
    // ============================================

    pub(crate) async fn connect(
        self: &Arc<Self>,
        url: &str,
        token: Option<&RedactedToken>,
    ) -> Result<(), GatewayError> {
        let generation = self.begin_connect().await;

        match self.establish(generation, url, token).await {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!("Gateway connect failed: {}", error);
                self.fail_connect(generation, &error).await;
                Err(error)
            }
        }
    }

    /// Soft-teardown whatever is open and start a fresh attempt.
    async fn begin_connect(&self) -> u64 {
        let (generation, previous) = {
            let mut shared = self.shared.lock();
            if shared.connection.is_some() {
                info!("Replacing existing gateway connection (subscribers kept)");
            }

            let previous = shared.teardown(&GatewayError::not_connected());
            shared.generation += 1;
            shared.challenge.reset();
            shared.sequence.reset();
            shared.last_failure = None;
            self.transition(&mut shared, ConnectionState::Connecting);

            (shared.generation, previous)
        };

        close_transport(previous, GOING_AWAY_CLOSE_CODE).await;
        generation
    }

    async fn establish(
        self: &Arc<Self>,
        generation: u64,
        url: &str,
        token: Option<&RedactedToken>,
    ) -> Result<(), GatewayError> {
        let timeouts = self.config.timeouts;
        let url = websocket_url(url)?;
        info!("Connecting to gateway at {}", url);

        let transport = match TokioTimeout(timeouts.connect(), self.connector.open(&url)).await {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                return Err(GatewayError::connection_failed(format!(
                    "Failed to open gateway connection: {e}"
                )));
            }
            Err(_) => {
                return Err(GatewayError::connection_failed(
                    "Timed out opening gateway connection",
                ));
            }
        };

        let challenge = match self.attach(generation, &transport) {
            Some(challenge) => challenge,
            None => {
                close_transport(Some(transport), NORMAL_CLOSE_CODE).await;
                return Err(GatewayError::connection_failed(
                    "Connect attempt superseded",
                ));
            }
        };

        let nonce = match TokioTimeout(timeouts.challenge(), challenge).await {
            Ok(Ok(nonce)) => nonce,
            Ok(Err(_)) => {
                return Err(match self.last_failure() {
                    Some(error @ GatewayError::ConnectionFailed { .. }) => error,
                    _ => GatewayError::connection_failed(
                        "Connection closed before connect.challenge",
                    ),
                });
            }
            Err(_) => return Err(GatewayError::connection_failed(CHALLENGE_TIMEOUT_REASON)),
        };
        debug!("Received connect.challenge");

        let params = self.connect_params(nonce, token)?;
        let hello = self
            .call(Some(generation), CONNECT_METHOD, params, timeouts.connect())
            .await
            .map_err(|e| match e {
                GatewayError::NotConnected { .. } => {
                    GatewayError::connection_failed(HANDSHAKE_CLOSED_REASON)
                }
                other => other,
            })?;

        self.finish_connect(generation, tick_interval_from_hello(&hello))
    }

    /// Store the opened transport and start its receive loop.
    ///
    /// Returns the challenge receiver, or `None` if a newer attempt or a
    /// disconnect happened while the transport was opening.
    fn attach(
        self: &Arc<Self>,
        generation: u64,
        transport: &Arc<dyn Transport>,
    ) -> Option<tokio::sync::oneshot::Receiver<String>> {
        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return None;
        }

        let cancel = CancellationToken::new();
        shared.connection = Some(ActiveConnection {
            transport: Arc::clone(transport),
            cancel: cancel.clone(),
        });
        shared.last_inbound = Instant::now();

        TokioSpawn(receive_loop(
            Arc::downgrade(self),
            generation,
            Arc::clone(transport),
            cancel.child_token(),
        ));

        Some(shared.challenge.register())
    }

    fn connect_params(
        &self,
        nonce: String,
        token: Option<&RedactedToken>,
    ) -> Result<Value, GatewayError> {
        let request = DeviceAuthRequest {
            client_id: self.config.client.id.clone(),
            client_mode: self.config.client.mode.clone(),
            role: self.config.role.clone(),
            scopes: self.config.scopes.clone(),
            signed_at_ms: epoch_millis(),
            token: token.cloned(),
            nonce: Some(nonce),
        };

        let signed = self.signer.sign_connect(&request).map_err(|e| {
            GatewayError::connection_failed(format!("Device identity signing failed: {e}"))
        })?;

        let params = ConnectParams::new(
            &self.config.client,
            signed,
            &self.config.role,
            &self.config.scopes,
            token.map(RedactedToken::as_str),
        );

        Ok(serde_json::to_value(params)?)
    }

    fn finish_connect(
        self: &Arc<Self>,
        generation: u64,
        tick_interval: Duration,
    ) -> Result<(), GatewayError> {
        let mut shared = self.shared.lock();
        if !shared.is_current(generation) {
            return Err(shared.last_failure.clone().unwrap_or_else(|| {
                GatewayError::connection_failed("Connection lost during handshake")
            }));
        }

        let Some(connection) = shared.connection.as_ref() else {
            return Err(GatewayError::not_connected());
        };
        let transport = Arc::clone(&connection.transport);
        let cancel = connection.cancel.clone();

        shared.tick_interval = tick_interval;
        self.transition(&mut shared, ConnectionState::Connected);

        TokioSpawn(heartbeat_loop(
            Arc::downgrade(self),
            generation,
            transport,
            self.config.timeouts.heartbeat(),
            cancel.child_token(),
        ));
        TokioSpawn(watchdog_loop(
            Arc::downgrade(self),
            generation,
            tick_interval,
            cancel.child_token(),
        ));

        info!("Connected to gateway (tick interval {:?})", tick_interval);
        Ok(())
    }

    /// Leave `Disconnected` after a failed attempt. Never schedules a retry.
    async fn fail_connect(&self, generation: u64, error: &GatewayError) {
        let transport = {
            let mut shared = self.shared.lock();
            if shared.generation != generation {
                return;
            }

            shared.last_failure = Some(error.clone());
            let transport = shared.teardown(error);
            self.transition(&mut shared, ConnectionState::Disconnected);
            transport
        };

        close_transport(transport, NORMAL_CLOSE_CODE).await;
    }

    // ============================================
    // TEARDOWN
    // ============================================

    /// Hard disconnect: everything goes, including subscriber streams.
    pub(crate) async fn disconnect(&self) {
        let transport = {
            let mut shared = self.shared.lock();
            shared.generation += 1;

            let transport = shared.teardown(&GatewayError::not_connected());
            let finished = shared.fanout.finish_all();
            if finished > 0 {
                info!("Finished {} event subscriber(s)", finished);
            }
            shared.last_failure = None;
            self.transition(&mut shared, ConnectionState::Disconnected);
            transport
        };

        close_transport(transport, NORMAL_CLOSE_CODE).await;
    }

    /// Soft disconnect after the transport failed underneath us.
    ///
    /// Ignored when `generation` no longer names the open transport.
    pub(crate) async fn handle_transport_failure(&self, generation: u64, cause: FailureCause) {
        let transport = {
            let mut shared = self.shared.lock();
            if !shared.is_current(generation) {
                debug!("Ignoring stale transport failure: {}", cause);
                return;
            }

            let error = cause.classify();
            warn!("Gateway connection lost: {} ({})", cause, error.error_category());

            // A handshake that loses its transport fails; it is not retried.
            let next = match shared.state {
                ConnectionState::Connecting => ConnectionState::Disconnected,
                _ => ConnectionState::Reconnecting,
            };

            shared.last_failure = Some(error.clone());
            let transport = shared.teardown(&error);
            self.transition(&mut shared, next);
            transport
        };

        close_transport(transport, GOING_AWAY_CLOSE_CODE).await;
    }

    // ============================================
    // REQUESTS
    // ============================================

    /// Send one request and wait for its outcome.
    ///
    /// With `fence = Some(generation)` the request may run during the
    /// handshake of that generation; otherwise the client must be `Connected`.
    pub(crate) async fn call(
        self: &Arc<Self>,
        fence: Option<u64>,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        let id = Uuid::new_v4().to_string();
        let frame = encode_request(&id, method, params)?;

        let (generation, transport, mut receiver) = {
            let mut shared = self.shared.lock();
            let allowed = match fence {
                Some(generation) => shared.generation == generation,
                None => shared.state == ConnectionState::Connected,
            };
            if !allowed {
                return Err(GatewayError::not_connected());
            }
            let Some(connection) = shared.connection.as_ref() else {
                return Err(GatewayError::not_connected());
            };
            let transport = Arc::clone(&connection.transport);

            let (receiver, timeout_token) = shared.correlator.register(id.clone(), method);
            self.spawn_request_timeout(id.clone(), timeout, timeout_token);

            (shared.generation, transport, receiver)
        };

        debug!("Sending request {} ({})", id, method);

        // The outcome can arrive while the send is still pending (timeout or
        // teardown); a stalled send must not hold the caller past it.
        let sent = tokio::select! {
            sent = transport.send(frame) => sent,
            outcome = &mut receiver => return settle(outcome),
        };

        if let Err(e) = sent {
            warn!("Failed to send request {} ({}): {}", id, method, e);
            self.handle_transport_failure(generation, FailureCause::Transport(e))
                .await;
            self.shared
                .lock()
                .correlator
                .resolve(&id, Err(GatewayError::not_connected()));
        }

        settle(receiver.await)
    }

    fn spawn_request_timeout(
        self: &Arc<Self>,
        id: String,
        timeout: Duration,
        cancel: CancellationToken,
    ) {
        let client = Arc::downgrade(self);

        TokioSpawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = TokioSleep(timeout) => {
                    let Some(client) = client.upgrade() else {
                        return;
                    };
                    let timed_out = client
                        .shared
                        .lock()
                        .correlator
                        .resolve(&id, Err(GatewayError::timeout()));
                    if timed_out {
                        warn!("Request {} timed out after {:?}", id, timeout);
                    }
                }
            }
        });
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(connection) = self.shared.get_mut().connection.take() {
            connection.cancel.cancel();
        }
    }
}

async fn close_transport(transport: Option<Arc<dyn Transport>>, code: u16) {
    if let Some(transport) = transport {
        transport.close(code).await;
    }
}

/// A dropped resolver means the request was torn down without an outcome.
fn settle(outcome: Result<Result<Value, GatewayError>, RecvError>) -> Result<Value, GatewayError> {
    outcome.unwrap_or_else(|_| Err(GatewayError::not_connected()))
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
