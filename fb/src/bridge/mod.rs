//! WebSocket bridge to the Figma plugin
//!
//! The plugin's UI iframe connects to this listener (default
//! `ws://127.0.0.1:9876`). Each connection becomes the correlator's peer:
//! outbound envelopes are written as text frames, inbound frames are handed to
//! the correlator verbatim.

mod server;

pub use server::BridgeServer;

/// Default listening port expected by the plugin
pub const DEFAULT_PORT: u16 = 9876;
