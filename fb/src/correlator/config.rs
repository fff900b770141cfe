//! Correlator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Correlator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CorrelatorConfig {
    /// Default time to wait for the plugin's acknowledgment
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Channel buffer size for correlator requests
    #[serde(rename = "channel-buffer")]
    pub channel_buffer: usize,

    /// Channel buffer size for frames queued to a peer
    #[serde(rename = "peer-channel-buffer")]
    pub peer_channel_buffer: usize,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            channel_buffer: 1000,
            peer_channel_buffer: 100,
        }
    }
}

impl CorrelatorConfig {
    /// Get the default request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        debug!(request_timeout_ms = %self.request_timeout_ms, "CorrelatorConfig::request_timeout: called");
        Duration::from_millis(self.request_timeout_ms)
    }
}
