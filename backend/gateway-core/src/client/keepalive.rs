//! Heartbeat and liveness watchdog.
//!
//! The two timers are independent. The heartbeat only probes the transport;
//! the watchdog only looks at when the last inbound frame arrived.

use crate::client::coordinator::{ClientInner, FailureCause};
use crate::transport::Transport;

use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Silence longer than this means the gateway is gone.
pub fn staleness_threshold(tick_interval: Duration) -> Duration {
    tick_interval.max(MIN_TICK_INTERVAL) * 2
}

pub(crate) async fn heartbeat_loop(
    client: Weak<ClientInner>,
    generation: u64,
    transport: Arc<dyn Transport>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let ping = tokio::select! {
            _ = cancel.cancelled() => break,
            ping = transport.ping() => ping,
        };

        match ping {
            Ok(()) => debug!("Heartbeat ping sent"),
            Err(e) => {
                warn!("Heartbeat ping failed: {}", e);
                if let Some(client) = client.upgrade() {
                    client
                        .handle_transport_failure(generation, FailureCause::Transport(e))
                        .await;
                }
                break;
            }
        }
    }
}

pub(crate) async fn watchdog_loop(
    client: Weak<ClientInner>,
    generation: u64,
    tick_interval: Duration,
    cancel: CancellationToken,
) {
    let threshold = staleness_threshold(tick_interval);
    let mut ticker = interval_at(Instant::now() + threshold, threshold);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(client) = client.upgrade() else {
            break;
        };
        let Some(elapsed) = client.elapsed_since_inbound(generation) else {
            break;
        };

        if elapsed >= threshold {
            warn!(
                "No gateway frames for {:?} (threshold {:?}), treating connection as dead",
                elapsed, threshold
            );
            client
                .handle_transport_failure(generation, FailureCause::Stale { elapsed })
                .await;
            break;
        }
    }
}
