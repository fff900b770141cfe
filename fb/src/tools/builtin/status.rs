//! get_status tool - report whether the plugin is attached

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolResult};

pub const CONNECTED_TEXT: &str = "Figma plugin is connected and ready.";
pub const DISCONNECTED_TEXT: &str = "Figma plugin is NOT connected. Open the figma-bridge plugin in Figma Desktop.";

/// Check if the Figma bridge plugin is connected
pub struct GetStatusTool;

#[async_trait]
impl Tool for GetStatusTool {
    fn name(&self) -> &'static str {
        "get_status"
    }

    fn description(&self) -> &'static str {
        "Check if the Figma bridge plugin is connected"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> ToolResult {
        debug!("GetStatusTool::execute: called");
        if ctx.correlator.is_connected().await {
            ToolResult::success(CONNECTED_TEXT)
        } else {
            ToolResult::success(DISCONNECTED_TEXT)
        }
    }
}
