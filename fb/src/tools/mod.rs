//! Tool system exposed over MCP
//!
//! Each tool turns `tools/call` arguments into one correlated request to the
//! Figma plugin and reports the plugin's acknowledgment back as text.

mod context;
mod error;
mod executor;
mod traits;

pub mod builtin;

pub use context::ToolContext;
pub use error::ToolError;
pub use executor::ToolExecutor;
pub use traits::{Tool, ToolDefinition, ToolResult};
