//! ToolContext - execution context for tools

use tracing::debug;

use crate::correlator::CorrelatorHandle;

/// Execution context shared by every tool call
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Channel to the Figma plugin
    pub correlator: CorrelatorHandle,
}

impl ToolContext {
    pub fn new(correlator: CorrelatorHandle) -> Self {
        debug!("ToolContext::new: called");
        Self { correlator }
    }
}
