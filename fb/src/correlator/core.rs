//! Main Correlator task implementation

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::config::CorrelatorConfig;
use super::envelope::{Envelope, Inbound};
use super::error::CallError;
use super::handle::CorrelatorHandle;
use super::messages::{CorrelatorMetrics, CorrelatorRequest, PeerId, RequestId};

/// Pending request tracking
struct PendingRequest {
    reply_tx: oneshot::Sender<Result<Value, CallError>>,
    kind: String,
    issued_at: Instant,
    timeout: Duration,
}

/// The single attached peer
struct Peer {
    id: PeerId,
    outbound: mpsc::Sender<String>,
}

impl Peer {
    fn is_writable(&self) -> bool {
        !self.outbound.is_closed()
    }
}

/// The Correlator pairs outbound requests with the plugin's acknowledgments
///
/// All state (peer slot, pending map, id counter) is owned by the task started
/// with [`Correlator::run`]; everything else talks to it through a
/// [`CorrelatorHandle`].
pub struct Correlator {
    config: CorrelatorConfig,
    tx: mpsc::Sender<CorrelatorRequest>,
    rx: mpsc::Receiver<CorrelatorRequest>,
}

impl Correlator {
    /// Create a new Correlator with the given configuration
    pub fn new(config: CorrelatorConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        Self { config, tx, rx }
    }

    /// Get a raw sender into the task
    pub fn sender(&self) -> mpsc::Sender<CorrelatorRequest> {
        self.tx.clone()
    }

    /// Create a handle using the configured default timeout
    pub fn handle(&self) -> CorrelatorHandle {
        CorrelatorHandle::new(self.tx.clone(), self.config.request_timeout())
    }

    /// Run the Correlator task
    ///
    /// This consumes the Correlator and runs until shutdown is requested.
    /// Requests still pending at shutdown resolve with [`CallError::Closed`].
    pub async fn run(mut self) {
        let correlator_tx = self.tx.clone();

        // Internal state
        let mut peer: Option<Peer> = None;
        let mut pending: HashMap<RequestId, PendingRequest> = HashMap::new();
        let mut next_request_id: RequestId = 0;
        let mut next_peer_id: PeerId = 0;

        // Metrics
        let mut metrics = CorrelatorMetrics::default();

        info!("Correlator started");

        while let Some(req) = self.rx.recv().await {
            metrics.messages_received += 1;

            match req {
                CorrelatorRequest::AttachPeer { outbound, reply_tx } => {
                    next_peer_id += 1;
                    let peer_id = next_peer_id;

                    match peer.replace(Peer { id: peer_id, outbound }) {
                        Some(old) => info!(old_peer_id = old.id, peer_id, "Peer superseded by new connection"),
                        None => info!(peer_id, "Peer connected"),
                    }

                    metrics.peer_connections += 1;
                    let _ = reply_tx.send(peer_id);
                }

                CorrelatorRequest::DetachPeer { peer_id } => {
                    if peer.as_ref().is_some_and(|p| p.id == peer_id) {
                        peer = None;
                        info!(
                            peer_id,
                            pending = pending.len(),
                            "Peer disconnected, pending requests left to their timeouts"
                        );
                    } else {
                        debug!(peer_id, "Ignoring detach of superseded peer");
                    }
                }

                CorrelatorRequest::Call {
                    kind,
                    payload,
                    timeout,
                    reply_tx,
                } => {
                    let outbound = match peer.as_ref() {
                        Some(p) if p.is_writable() => &p.outbound,
                        _ => {
                            debug!(%kind, "Rejecting call, no live peer");
                            metrics.not_connected += 1;
                            let _ = reply_tx.send(Err(CallError::NotConnected));
                            continue;
                        }
                    };

                    // Never await the peer here: a stalled writer would freeze timeouts
                    let permit = match outbound.try_reserve() {
                        Ok(permit) => permit,
                        Err(TrySendError::Full(())) => {
                            warn!(%kind, "Peer channel full, rejecting call");
                            metrics.peer_busy += 1;
                            let _ = reply_tx.send(Err(CallError::PeerBusy));
                            continue;
                        }
                        Err(TrySendError::Closed(())) => {
                            debug!(%kind, "Peer channel closed, rejecting call");
                            metrics.not_connected += 1;
                            let _ = reply_tx.send(Err(CallError::NotConnected));
                            continue;
                        }
                    };

                    next_request_id += 1;
                    let request_id = next_request_id;

                    let frame = match Envelope::new(kind.as_str(), request_id, payload).to_json() {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(request_id, error = %e, "Failed to encode envelope");
                            let _ = reply_tx.send(Err(CallError::Encode(e)));
                            continue;
                        }
                    };
                    permit.send(frame);

                    metrics.requests_sent += 1;
                    debug!(request_id, %kind, ?timeout, "Request sent");

                    pending.insert(
                        request_id,
                        PendingRequest {
                            reply_tx,
                            kind,
                            issued_at: Instant::now(),
                            timeout,
                        },
                    );

                    // Spawn timeout handler
                    let timeout_tx = correlator_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(timeout).await;
                        let _ = timeout_tx.send(CorrelatorRequest::CallTimeout { request_id }).await;
                    });
                }

                CorrelatorRequest::Inbound { raw } => match Inbound::parse(&raw) {
                    Inbound::Ack { request_id, body } => {
                        if let Some(req) = pending.remove(&request_id) {
                            debug!(
                                request_id,
                                kind = %req.kind,
                                elapsed_ms = req.issued_at.elapsed().as_millis() as u64,
                                "Acknowledgment matched"
                            );
                            let _ = req.reply_tx.send(Ok(body));
                            metrics.acks_matched += 1;
                        } else {
                            debug!(request_id, "Dropping acknowledgment for unknown request");
                            metrics.acks_dropped += 1;
                        }
                    }
                    Inbound::Ignored => {
                        debug!("Ignoring non-acknowledgment message");
                    }
                    Inbound::Malformed => {
                        debug!(len = raw.len(), "Discarding malformed message");
                        metrics.malformed_messages += 1;
                    }
                },

                CorrelatorRequest::CallTimeout { request_id } => {
                    if let Some(req) = pending.remove(&request_id) {
                        let timeout_ms = u64::try_from(req.timeout.as_millis()).unwrap_or(u64::MAX);
                        warn!(request_id, kind = %req.kind, timeout_ms, "Request timed out");
                        let _ = req.reply_tx.send(Err(CallError::Timeout { timeout_ms }));
                        metrics.timeouts += 1;
                    }
                }

                CorrelatorRequest::IsConnected { reply_tx } => {
                    let _ = reply_tx.send(peer.as_ref().is_some_and(Peer::is_writable));
                }

                CorrelatorRequest::GetMetrics { reply_tx } => {
                    metrics.pending_requests = pending.len();
                    metrics.peer_connected = peer.as_ref().is_some_and(Peer::is_writable);
                    let _ = reply_tx.send(metrics.clone());
                }

                CorrelatorRequest::Shutdown => {
                    info!("Correlator shutting down");
                    break;
                }
            }
        }

        if !pending.is_empty() {
            info!(pending = pending.len(), "Abandoning pending requests");
        }
        info!("Correlator stopped");
    }
}
