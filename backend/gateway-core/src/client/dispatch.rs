//! Receive loop and inbound frame routing.

use crate::client::coordinator::{ClientInner, FailureCause};
use crate::client::fanout::GatewayEvent;
use crate::client::sequence::SequenceCheck;
use crate::protocol::{CHALLENGE_EVENT, Frame, challenge_nonce, decode_frame};
use crate::transport::{CloseInfo, Transport, TransportFrame};

use std::sync::{Arc, Weak};

use log::{debug, info, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drain one transport until it ends, fails, or `cancel` fires.
///
/// Ending or failing the transport reports a failure for `generation`;
/// cancellation exits quietly.
pub(crate) async fn receive_loop(
    client: Weak<ClientInner>,
    generation: u64,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
) {
    debug!("Receive loop started (generation {})", generation);

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = transport.receive() => received,
        };

        let Some(client) = client.upgrade() else {
            break;
        };

        let cause = match received {
            Some(Ok(TransportFrame::Text(text))) => {
                dispatch_text(&client, generation, &text);
                continue;
            }
            Some(Ok(TransportFrame::Binary(bytes))) => {
                match String::from_utf8(bytes) {
                    Ok(text) => dispatch_text(&client, generation, &text),
                    Err(e) => {
                        touch(&client, generation);
                        warn!("Dropping non-UTF-8 gateway frame: {}", e);
                    }
                }
                continue;
            }
            Some(Ok(TransportFrame::Closed(info))) => FailureCause::Closed(info),
            Some(Err(e)) => FailureCause::Transport(e),
            None => FailureCause::Closed(CloseInfo::default()),
        };

        client.handle_transport_failure(generation, cause).await;
        break;
    }

    debug!("Receive loop stopped (generation {})", generation);
}

/// Route one decoded text frame.
pub(crate) fn dispatch_text(client: &ClientInner, generation: u64, text: &str) {
    let decoded = decode_frame(text);

    let mut shared = client.shared.lock();
    if !shared.is_current(generation) {
        return;
    }
    shared.last_inbound = Instant::now();

    let frame = match decoded {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Dropping malformed gateway frame: {}", e);
            return;
        }
    };

    match frame {
        Frame::Res(response) => {
            let id = response.id.clone();
            if !shared.correlator.resolve(&id, response.into_result()) {
                debug!("Dropping response for unknown request {}", id);
            }
        }
        Frame::Event(event) if event.event == CHALLENGE_EVENT => {
            match challenge_nonce(&event.payload) {
                Some(nonce) => {
                    if !shared.challenge.deliver(nonce) {
                        debug!("Ignoring extra connect.challenge");
                    }
                }
                None => warn!("connect.challenge arrived without a nonce"),
            }
        }
        Frame::Event(event) => {
            if let Some(seq) = event.seq {
                match shared.sequence.observe(seq) {
                    SequenceCheck::Gap { expected, received } => warn!(
                        "Event sequence gap: expected {}, received {} ({} event(s) lost)",
                        expected,
                        received,
                        received - expected
                    ),
                    SequenceCheck::Behind { last, received } => {
                        debug!("Event seq {} arrived after {}", received, last)
                    }
                    SequenceCheck::First | SequenceCheck::InOrder => {}
                }
            }

            let event = GatewayEvent::from(event);
            let delivered = shared.fanout.broadcast(&event);
            debug!("Event {} delivered to {} subscriber(s)", event.event, delivered);
        }
        Frame::Req(request) => {
            info!("Ignoring server request {} ({})", request.id, request.method);
        }
    }
}

/// Count a frame that could not be decoded as liveness anyway.
fn touch(client: &ClientInner, generation: u64) {
    let mut shared = client.shared.lock();
    if shared.is_current(generation) {
        shared.last_inbound = Instant::now();
    }
}
