//! Tool error types

use thiserror::Error;

/// Errors that can occur before a tool reaches the plugin
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    UnknownTool { name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid design JSON: {0}")]
    InvalidDesign(#[source] serde_json::Error),
}
