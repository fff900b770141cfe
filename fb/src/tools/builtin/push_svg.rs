//! push_svg_to_figma tool - insert raw SVG markup

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::ack_result;
use crate::tools::{Tool, ToolContext, ToolResult};

/// Message kind the plugin imports as a vector node
pub const PUSH_SVG: &str = "push_svg";

/// Node name used when the caller gives none
pub const DEFAULT_SVG_NAME: &str = "SVG Import";

/// Push SVG markup to Figma as a single vector node
pub struct PushSvgTool;

#[async_trait]
impl Tool for PushSvgTool {
    fn name(&self) -> &'static str {
        "push_svg_to_figma"
    }

    fn description(&self) -> &'static str {
        "Push raw SVG code to Figma as a single vector node (quick but not editable as native nodes)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "svg": {
                    "type": "string",
                    "description": "The SVG markup string to insert into Figma"
                },
                "name": {
                    "type": "string",
                    "description": "Optional name for the SVG node in Figma"
                }
            },
            "required": ["svg"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!("PushSvgTool::execute: called");
        let svg = match input["svg"].as_str() {
            Some(s) => s,
            None => return ToolResult::error("Error: svg is required"),
        };
        let name = input["name"]
            .as_str()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_SVG_NAME);

        let outcome = ctx.correlator.call(PUSH_SVG, json!({"svg": svg, "name": name})).await;
        ack_result(outcome, "SVG pushed to Figma successfully.")
    }
}
