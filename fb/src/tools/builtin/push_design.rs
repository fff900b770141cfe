//! push_to_figma tool - send a design tree to the plugin

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::ack_result;
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

/// Message kind the plugin renders as native nodes
pub const PUSH_DESIGN: &str = "push_design";

const DESIGN_DESCRIPTION: &str = "JSON string of the design tree. Root node should have type FRAME/TEXT/RECTANGLE/ELLIPSE. \
Each node can have: type, name, width, height, fill (hex color), layoutMode (VERTICAL/HORIZONTAL), \
padding [top,right,bottom,left], itemSpacing (gap), cornerRadius, clipsContent, \
primaryAxisAlignItems (MIN/CENTER/MAX/SPACE_BETWEEN), counterAxisAlignItems (MIN/CENTER/MAX), \
primaryAxisSizingMode (FIXED/AUTO), counterAxisSizingMode (FIXED/AUTO), \
stroke ({color, weight}), strokeDashes [dash, gap], opacity, \
children (array of child nodes). \
TEXT nodes also have: content, fontSize, fontFamily, fontWeight, textAlignHorizontal (LEFT/CENTER/RIGHT), \
textAutoResize (WIDTH_AND_HEIGHT/HEIGHT/NONE). \
SVG nodes have: svg (markup). \
Size values: number (px), \"FILL\" (fill_container), \"HUG\" (fit_content).";

/// Push a structured design to Figma as editable nodes
pub struct PushDesignTool;

/// Extract the design tree from tool input
///
/// Accepts the JSON text the schema asks for, or an already-decoded object.
fn parse_design(input: &Value) -> Result<Value, ToolError> {
    match input.get("design") {
        Some(Value::String(text)) => serde_json::from_str(text).map_err(ToolError::InvalidDesign),
        Some(tree @ Value::Object(_)) => Ok(tree.clone()),
        Some(_) => Err(ToolError::InvalidArgument("design must be a JSON string".to_string())),
        None => Err(ToolError::InvalidArgument("design is required".to_string())),
    }
}

#[async_trait]
impl Tool for PushDesignTool {
    fn name(&self) -> &'static str {
        "push_to_figma"
    }

    fn description(&self) -> &'static str {
        "Push a structured design JSON to Figma as native editable nodes (frames with auto-layout, text, rectangles, etc.)"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "design": {
                    "type": "string",
                    "description": DESIGN_DESCRIPTION
                }
            },
            "required": ["design"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!("PushDesignTool::execute: called");
        let design = match parse_design(&input) {
            Ok(d) => d,
            Err(e) => return ToolResult::error(format!("Error: {}", e)),
        };

        let outcome = ctx.correlator.call(PUSH_DESIGN, design).await;
        ack_result(outcome, "Design pushed to Figma successfully.")
    }
}
