//! figma-bridge: push AI-generated designs into Figma
//!
//! An MCP server on stdio exposes design tools to an AI client. Each tool call
//! becomes a request to the Figma plugin over a WebSocket, and the plugin's
//! acknowledgment becomes the tool result.
//!
//! - [`correlator`]: request/acknowledgment pairing over the plugin socket
//! - [`bridge`]: WebSocket listener the plugin connects to
//! - [`tools`]: `push_to_figma`, `push_svg_to_figma`, `get_status`
//! - [`mcp`]: JSON-RPC 2.0 server over stdio

pub mod bridge;
pub mod cli;
pub mod config;
pub mod correlator;
pub mod mcp;
pub mod tools;

pub use bridge::BridgeServer;
pub use config::{BridgeConfig, Config, McpConfig};
pub use correlator::{CallError, Correlator, CorrelatorConfig, CorrelatorHandle};
pub use mcp::McpServer;
pub use tools::{ToolContext, ToolExecutor};
