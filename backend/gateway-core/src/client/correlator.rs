//! Pending request tracking.
//!
//! Each outgoing request owns one entry holding its resolver and the
//! cancellation token of its timeout task. An entry is removed *before* it is
//! resolved, so whichever of response, timeout, or teardown gets here first
//! wins and every later attempt finds nothing to resolve.

use crate::error::GatewayError;

use std::collections::HashMap;

use log::debug;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub(crate) type RequestResult = Result<Value, GatewayError>;

#[derive(Debug)]
struct PendingRequest {
    method: String,
    resolver: oneshot::Sender<RequestResult>,
    timeout: CancellationToken,
    created_at: Instant,
}

#[derive(Debug, Default)]
pub(crate) struct RequestCorrelator {
    pending: HashMap<String, PendingRequest>,
}

impl RequestCorrelator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Track a new request id.
    ///
    /// Returns the receiver the caller awaits and the token that cancels the
    /// request's timeout task.
    pub(crate) fn register(
        &mut self,
        id: String,
        method: &str,
    ) -> (oneshot::Receiver<RequestResult>, CancellationToken) {
        let (resolver, receiver) = oneshot::channel();
        let timeout = CancellationToken::new();

        let previous = self.pending.insert(
            id,
            PendingRequest {
                method: method.to_string(),
                resolver,
                timeout: timeout.clone(),
                created_at: Instant::now(),
            },
        );
        if let Some(previous) = previous {
            previous.timeout.cancel();
        }

        (receiver, timeout)
    }

    /// Resolve one request. Returns `false` if the id is not pending.
    pub(crate) fn resolve(&mut self, id: &str, result: RequestResult) -> bool {
        let Some(pending) = self.pending.remove(id) else {
            return false;
        };

        pending.timeout.cancel();
        debug!(
            "Request {} ({}) settled after {:?}",
            id,
            pending.method,
            pending.created_at.elapsed()
        );

        if pending.resolver.send(result).is_err() {
            debug!("Caller of request {} stopped waiting", id);
        }
        true
    }

    /// Fail every pending request with the same error and clear the set.
    pub(crate) fn fail_all(&mut self, error: &GatewayError) -> usize {
        let count = self.pending.len();

        for (_, pending) in self.pending.drain() {
            pending.timeout.cancel();
            // Callers that stopped waiting are fine to skip.
            let _ = pending.resolver.send(Err(error.clone()));
        }

        count
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
