//! Message types for the Correlator task

use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::error::CallError;

/// Correlation id carried in `requestId`
pub type RequestId = u64;

/// Attach generation of a peer connection (never sent on the wire)
pub type PeerId = u64;

/// Internal requests to the Correlator task
#[derive(Debug)]
pub enum CorrelatorRequest {
    /// A new peer connected; it supersedes any previous one
    AttachPeer {
        outbound: mpsc::Sender<String>,
        reply_tx: oneshot::Sender<PeerId>,
    },

    /// A peer connection ended
    DetachPeer { peer_id: PeerId },

    /// Issue a correlated request to the current peer
    Call {
        kind: String,
        payload: Value,
        timeout: Duration,
        reply_tx: oneshot::Sender<Result<Value, CallError>>,
    },

    /// Raw text frame received from a peer
    Inbound { raw: String },

    /// Timer for a pending request elapsed (internal)
    CallTimeout { request_id: RequestId },

    /// Whether a writable peer is attached
    IsConnected { reply_tx: oneshot::Sender<bool> },

    /// Get current metrics
    GetMetrics {
        reply_tx: oneshot::Sender<CorrelatorMetrics>,
    },

    /// Shutdown the correlator
    Shutdown,
}

/// Correlator metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelatorMetrics {
    pub peer_connected: bool,
    pub peer_connections: u64,
    pub pending_requests: usize,
    pub requests_sent: u64,
    pub acks_matched: u64,
    pub acks_dropped: u64,
    pub malformed_messages: u64,
    pub not_connected: u64,
    pub peer_busy: u64,
    pub timeouts: u64,
    pub messages_received: u64,
}
