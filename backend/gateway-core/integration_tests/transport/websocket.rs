//! End-to-end tests against a loopback tokio-tungstenite gateway.

use crate::client::helpers::{StaticSigner, WAIT};

use gateway_core::config::GatewayConfig;
use gateway_core::{ConnectionState, GatewayClient, GatewayError};

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, accept_async};

/// Test helper: Next text frame from the client, parsed.
async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let message = ws
            .next()
            .await
            .expect("Client went away")
            .expect("Error receiving message");
        if message.is_text() {
            return serde_json::from_str(message.to_text().unwrap()).unwrap();
        }
    }
}

/// Test helper: Send a JSON frame as text.
async fn send_json(ws: &mut WebSocketStream<TcpStream>, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("Failed to send message");
}

/// **VALUE**: Runs the real WebSocket transport through handshake, one
/// request, one event, and a policy close.
///
/// **WHY THIS MATTERS**: The in-memory transport proves the client logic. This
/// proves tungstenite frames, close codes and close reasons map onto it.
///
/// **BUG THIS CATCHES**: Would catch the close reason being lost in the
/// tungstenite adapter, or text frames arriving as something else.
#[tokio::test]
async fn given_loopback_gateway_when_session_runs_then_requests_events_and_close_flow() {
    // GIVEN: A gateway on a random loopback port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let gateway = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        send_json(
            &mut ws,
            json!({"type": "event", "event": "connect.challenge", "payload": {"nonce": "n-9"}}),
        )
        .await;

        let connect = next_json(&mut ws).await;
        assert_eq!(connect["method"], "connect");
        assert_eq!(connect["params"]["device"]["nonce"], "n-9");
        send_json(
            &mut ws,
            json!({"type": "res", "id": connect["id"], "ok": true, "payload": {"policy": {"tickIntervalMs": 30_000}}}),
        )
        .await;

        let health = next_json(&mut ws).await;
        assert_eq!(health["method"], "health");
        send_json(
            &mut ws,
            json!({"type": "res", "id": health["id"], "ok": true, "payload": {"status": "ok"}}),
        )
        .await;

        send_json(
            &mut ws,
            json!({"type": "event", "event": "presence", "payload": {"who": "ops"}, "seq": 1}),
        )
        .await;

        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Policy,
            reason: "token revoked".into(),
        })))
        .await
        .unwrap();

        // Drain until the client completes the close handshake
        while let Some(Ok(_)) = ws.next().await {}
    });

    let client = GatewayClient::websocket(GatewayConfig::default(), Arc::new(StaticSigner::default()));
    let mut events = client.events();
    let mut state = client.watch_state();

    // WHEN
    timeout(WAIT, client.connect(&format!("http://127.0.0.1:{port}/ui"), None))
        .await
        .unwrap()
        .unwrap();
    let health = timeout(WAIT, client.request("health", json!({})))
        .await
        .unwrap()
        .unwrap();

    // THEN
    assert_eq!(health, json!({"status": "ok"}));

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.event, "presence");
    assert_eq!(event.seq, Some(1));

    timeout(WAIT, state.wait_for(|state| *state == ConnectionState::Reconnecting))
        .await
        .unwrap()
        .unwrap();
    let failure = client.last_failure().unwrap();
    assert!(matches!(failure, GatewayError::ConnectionFailed { .. }));
    assert_eq!(failure.detail(), Some("token revoked"));

    timeout(WAIT, gateway).await.unwrap().unwrap();
}

#[tokio::test]
async fn given_nothing_listening_when_connecting_then_connection_failed() {
    // GIVEN: A port that was just released
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let client = GatewayClient::websocket(GatewayConfig::default(), Arc::new(StaticSigner::default()));

    // WHEN
    let result = timeout(WAIT, client.connect(&format!("ws://127.0.0.1:{port}"), None))
        .await
        .unwrap();

    // THEN
    assert!(matches!(result, Err(GatewayError::ConnectionFailed { .. })));
    assert_eq!(client.state(), ConnectionState::Disconnected);
}
