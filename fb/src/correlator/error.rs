//! Correlator error types

use thiserror::Error;

/// Why a correlated call did not resolve with an acknowledgment
#[derive(Debug, Error)]
pub enum CallError {
    /// No live peer when the call was issued; nothing was sent
    #[error("Figma plugin is not connected. Open the figma-bridge plugin in Figma first.")]
    NotConnected,

    /// No matching acknowledgment arrived within the bound
    #[error("Timeout: Figma plugin did not respond within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The peer's outbound queue is full; nothing was sent
    #[error("Figma plugin is not keeping up with requests. Try again shortly.")]
    PeerBusy,

    #[error("Failed to encode request envelope: {0}")]
    Encode(#[from] serde_json::Error),

    /// The correlator task is gone (shutdown or panic)
    #[error("Correlator channel closed")]
    Closed,
}

impl CallError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}
