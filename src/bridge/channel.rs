//! In-process bridge host: requests travel over an `mpsc` channel and each
//! one gets its own `oneshot` reply.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Notify};

use super::{Bridge, BridgeRequest, BridgeResponse};
use crate::{AppError, AppResult};

const QUEUE_DEPTH: usize = 64;

type Reply = oneshot::Sender<AppResult<BridgeResponse>>;

/// Sending side of a spawned host. Cheap to clone.
#[derive(Clone)]
pub struct BridgeHandle {
    tx: mpsc::Sender<(BridgeRequest, Reply)>,
    shutdown: Arc<Notify>,
}

fn host_closed(op: &'static str) -> AppError {
    AppError::new(AppError::BRIDGE_CLOSED_CODE, "The bridge host is no longer running")
        .with_context("op", op)
}

/// Start the host loop on the current tokio runtime. Requests are handled
/// concurrently, one task each, so replies may arrive out of order.
pub fn spawn(bridge: Bridge) -> BridgeHandle {
    let (tx, mut rx) = mpsc::channel::<(BridgeRequest, Reply)>(QUEUE_DEPTH);
    let shutdown = Arc::new(Notify::new());
    let stop = Arc::clone(&shutdown);

    tokio::spawn(async move {
        tracing::debug!(target: "localdesk", event = "bridge_host_started");
        loop {
            tokio::select! {
                _ = stop.notified() => break,
                next = rx.recv() => {
                    let Some((request, reply)) = next else { break };
                    let bridge = bridge.clone();
                    tokio::spawn(async move {
                        let _ = reply.send(bridge.dispatch(request).await);
                    });
                }
            }
        }
        tracing::debug!(target: "localdesk", event = "bridge_host_stopped");
    });

    BridgeHandle { tx, shutdown }
}

impl BridgeHandle {
    pub async fn call(&self, request: BridgeRequest) -> AppResult<BridgeResponse> {
        let op = request.op();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| host_closed(op))?;
        reply_rx.await.map_err(|_| host_closed(op))?
    }

    /// Stop accepting requests. In-flight requests still complete.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
