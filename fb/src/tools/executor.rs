//! ToolExecutor - registry and dispatch for MCP tools

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::builtin::{GetStatusTool, PushDesignTool, PushSvgTool};
use super::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

/// Registry of the tools offered to the MCP client
pub struct ToolExecutor {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Create executor with the Figma tools
    pub fn standard() -> Self {
        let mut executor = Self::empty();
        executor.add_tool(Box::new(PushDesignTool));
        executor.add_tool(Box::new(PushSvgTool));
        executor.add_tool(Box::new(GetStatusTool));
        executor
    }

    /// Create an empty executor (for testing)
    pub fn empty() -> Self {
        Self { tools: BTreeMap::new() }
    }

    /// Add a tool to the executor
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Tool definitions for `tools/list`, ordered by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool call
    pub async fn execute(&self, name: &str, input: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        debug!(%name, "ToolExecutor::execute: called");
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool { name: name.to_string() })?;
        check_required(&tool.input_schema(), &input)?;
        Ok(tool.execute(input, ctx).await)
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get tool names
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

/// Reject arguments that are not an object or lack a `required` property
fn check_required(schema: &Value, input: &Value) -> Result<(), ToolError> {
    let args = input
        .as_object()
        .ok_or_else(|| ToolError::InvalidArgument("arguments must be an object".to_string()))?;

    let required = schema["required"].as_array().into_iter().flatten().filter_map(Value::as_str);
    for key in required {
        if args.get(key).is_none_or(Value::is_null) {
            return Err(ToolError::InvalidArgument(format!("Missing required parameter: {}", key)));
        }
    }
    Ok(())
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::standard()
    }
}
