//! CorrelatorHandle - client interface for the bridge and the tool surface

use std::time::Duration;

use eyre::{Result, eyre};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::error::CallError;
use super::messages::{CorrelatorMetrics, CorrelatorRequest, PeerId};

/// Handle for interacting with a running Correlator
///
/// Cloneable; every clone talks to the same task.
#[derive(Debug, Clone)]
pub struct CorrelatorHandle {
    tx: mpsc::Sender<CorrelatorRequest>,
    default_timeout: Duration,
}

impl CorrelatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<CorrelatorRequest>, default_timeout: Duration) -> Self {
        Self { tx, default_timeout }
    }

    /// Timeout applied by [`CorrelatorHandle::call`]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Send a request to the peer and wait for its acknowledgment
    pub async fn call(&self, kind: &str, payload: Value) -> Result<Value, CallError> {
        self.call_with_timeout(kind, payload, self.default_timeout).await
    }

    /// Send a request to the peer and wait at most `timeout` for its acknowledgment
    ///
    /// Resolves with the whole acknowledgment object. Fails with
    /// [`CallError::NotConnected`] without waiting when no peer is attached.
    pub async fn call_with_timeout(&self, kind: &str, payload: Value, timeout: Duration) -> Result<Value, CallError> {
        debug!(%kind, ?timeout, "CorrelatorHandle::call_with_timeout: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(CorrelatorRequest::Call {
                kind: kind.to_string(),
                payload,
                timeout,
                reply_tx,
            })
            .await
            .map_err(|_| CallError::Closed)?;

        reply_rx.await.map_err(|_| CallError::Closed)?
    }

    /// Attach a new peer; frames for it are pushed into `outbound`
    pub async fn attach_peer(&self, outbound: mpsc::Sender<String>) -> Result<PeerId> {
        debug!("CorrelatorHandle::attach_peer: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(CorrelatorRequest::AttachPeer { outbound, reply_tx })
            .await
            .map_err(|_| eyre!("Correlator channel closed"))?;

        reply_rx.await.map_err(|_| eyre!("Correlator shutdown during attach"))
    }

    /// Detach a peer; no-op if it has already been superseded
    pub async fn detach_peer(&self, peer_id: PeerId) -> Result<()> {
        debug!(peer_id, "CorrelatorHandle::detach_peer: called");
        self.tx
            .send(CorrelatorRequest::DetachPeer { peer_id })
            .await
            .map_err(|_| eyre!("Correlator channel closed"))
    }

    /// Hand a raw inbound frame to the correlator
    pub async fn deliver(&self, raw: impl Into<String>) -> Result<()> {
        self.tx
            .send(CorrelatorRequest::Inbound { raw: raw.into() })
            .await
            .map_err(|_| eyre!("Correlator channel closed"))
    }

    /// Whether a writable peer is attached (false once the correlator is gone)
    pub async fn is_connected(&self) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(CorrelatorRequest::IsConnected { reply_tx }).await.is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    /// Snapshot of the correlator's counters
    pub async fn metrics(&self) -> Result<CorrelatorMetrics> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CorrelatorRequest::GetMetrics { reply_tx })
            .await
            .map_err(|_| eyre!("Correlator channel closed"))?;

        reply_rx.await.map_err(|_| eyre!("Correlator shutdown"))
    }

    /// Request shutdown of the correlator
    pub async fn shutdown(&self) -> Result<()> {
        debug!("CorrelatorHandle::shutdown: called");
        self.tx
            .send(CorrelatorRequest::Shutdown)
            .await
            .map_err(|_| eyre!("Correlator channel closed"))
    }
}
