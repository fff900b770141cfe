//! Model Context Protocol server
//!
//! JSON-RPC 2.0, one message per line, over stdin/stdout. The AI client
//! discovers the Figma tools with `tools/list` and invokes them with
//! `tools/call`; each call runs in its own task so a slow plugin round trip
//! never blocks other requests.
//!
//! stdout carries protocol traffic only. Logging goes to the log file.

mod server;
mod types;

pub use server::McpServer;
pub use types::{
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, McpError, McpRequest, McpResponse, PARSE_ERROR,
};

/// Protocol version offered when the client asks for one we do not know
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol versions echoed back during `initialize`
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];
