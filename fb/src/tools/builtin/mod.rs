//! Figma tools exposed over MCP

mod push_design;
mod push_svg;
mod status;

pub use push_design::PushDesignTool;
pub use push_svg::PushSvgTool;
pub use status::GetStatusTool;

use serde_json::Value;

use crate::correlator::{Ack, CallError};
use crate::tools::ToolResult;

/// Prefix the plugin uses for acknowledgments that report a failure
const PLUGIN_ERROR_PREFIX: &str = "Error:";

/// Report a correlated call as a tool result
///
/// A resolved call carries the plugin's ack body. Its `message` is appended to
/// `success`, unless the plugin flagged the ack itself as an error.
pub(crate) fn ack_result(outcome: Result<Value, CallError>, success: &str) -> ToolResult {
    match outcome {
        Ok(body) => {
            let message = Ack::from_body(&body).and_then(|ack| ack.message).unwrap_or_default();
            if message.starts_with(PLUGIN_ERROR_PREFIX) {
                ToolResult::error(message)
            } else {
                ToolResult::success(format!("{} {}", success, message).trim_end().to_string())
            }
        }
        Err(e) => ToolResult::error(format!("Error: {}", e)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ack_result_appends_message() {
        let result = ack_result(Ok(json!({"type": "ack", "requestId": 1, "message": "Created frame Card"})), "Done.");
        assert!(!result.is_error);
        assert_eq!(result.content, "Done. Created frame Card");
    }

    #[test]
    fn test_ack_result_without_message() {
        let result = ack_result(Ok(json!({"type": "ack", "requestId": 1})), "Done.");
        assert!(!result.is_error);
        assert_eq!(result.content, "Done.");
    }

    #[test]
    fn test_ack_result_plugin_error() {
        let result = ack_result(
            Ok(json!({"type": "ack", "requestId": 1, "message": "Error: font not found"})),
            "Done.",
        );
        assert!(result.is_error);
        assert_eq!(result.content, "Error: font not found");
    }

    #[test]
    fn test_ack_result_call_error() {
        let result = ack_result(Err(CallError::Timeout { timeout_ms: 50 }), "Done.");
        assert!(result.is_error);
        assert_eq!(result.content, "Error: Timeout: Figma plugin did not respond within 50ms");
    }
}
