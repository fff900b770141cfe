//! McpServer - JSON-RPC dispatch and the stdio transport

use std::sync::Arc;

use eyre::{Context, Result};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::types::{McpError, McpRequest, McpResponse};
use super::{MCP_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};
use crate::config::McpConfig;
use crate::tools::{ToolContext, ToolError, ToolExecutor};

/// Serves the Figma tools to an MCP client
#[derive(Clone)]
pub struct McpServer {
    executor: Arc<ToolExecutor>,
    ctx: ToolContext,
    server_name: String,
    server_version: String,
}

impl McpServer {
    pub fn new(config: &McpConfig, executor: ToolExecutor, ctx: ToolContext) -> Self {
        debug!(name = %config.server_name, "McpServer::new: called");
        Self {
            executor: Arc::new(executor),
            ctx,
            server_name: config.server_name.clone(),
            server_version: config.server_version.clone(),
        }
    }

    /// Serve the process stdin/stdout until stdin closes
    pub async fn run_stdio(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC until `reader` reaches EOF
    ///
    /// Every request is handled in its own task. Responses go through a single
    /// writer, in completion order. Returns once all in-flight responses have
    /// been written.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!("MCP server started");

        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<McpResponse>();
        let writer_task = tokio::spawn(async move {
            let mut writer = BufWriter::new(writer);
            while let Some(response) = response_rx.recv().await {
                write_response(&mut writer, &response).await?;
            }
            Ok::<_, eyre::Report>(())
        });

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read MCP input")? {
            if line.trim().is_empty() {
                continue;
            }
            debug!(len = line.len(), "MCP message received");

            let server = self.clone();
            let response_tx = response_tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_message(&line).await {
                    let _ = response_tx.send(response);
                }
            });
        }

        // The writer drains once every in-flight handler has dropped its sender
        drop(response_tx);
        writer_task.await.context("MCP writer task failed")??;

        info!("MCP server stopped (input closed)");
        Ok(())
    }

    /// Handle one raw message; `None` for notifications
    pub async fn handle_message(&self, line: &str) -> Option<McpResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON-RPC message");
                return Some(McpResponse::error(
                    Value::Null,
                    McpError::parse_error(format!("Parse error: {}", e)),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: McpRequest = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Invalid JSON-RPC request");
                return Some(McpResponse::error(
                    id,
                    McpError::invalid_request(format!("Invalid request: {}", e)),
                ));
            }
        };

        let id = match &request.id {
            None => {
                debug!(method = %request.method, "MCP notification");
                return None;
            }
            Some(Value::Null) => {
                warn!(method = %request.method, "Request with null id");
                return Some(McpResponse::error(
                    Value::Null,
                    McpError::invalid_request("Request id must not be null"),
                ));
            }
            Some(id) => id.clone(),
        };
        let method = request.method.clone();
        let response = match self.dispatch(request).await {
            Ok(result) => McpResponse::success(id, result),
            Err(error) => {
                warn!(%method, code = error.code, message = %error.message, "MCP request failed");
                McpResponse::error(id, error)
            }
        };
        Some(response)
    }

    async fn dispatch(&self, request: McpRequest) -> Result<Value, McpError> {
        debug!(method = %request.method, "McpServer::dispatch: called");
        match request.method.as_str() {
            "initialize" => Ok(self.initialize(&request.params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(McpError::method_not_found(other)),
        }
    }

    fn initialize(&self, params: &Value) -> Value {
        let requested = params["protocolVersion"].as_str().unwrap_or_default();
        let version = if SUPPORTED_PROTOCOL_VERSIONS.contains(&requested) {
            requested
        } else {
            MCP_PROTOCOL_VERSION
        };
        info!(client = ?params["clientInfo"]["name"].as_str(), %version, "MCP client initialized");

        json!({
            "protocolVersion": version,
            "serverInfo": {
                "name": self.server_name,
                "version": self.server_version
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        })
    }

    fn list_tools(&self) -> Value {
        json!({ "tools": self.executor.definitions() })
    }

    async fn call_tool(&self, params: Value) -> Result<Value, McpError> {
        let name = params["name"]
            .as_str()
            .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;
        let arguments = match params.get("arguments") {
            Some(Value::Null) | None => json!({}),
            Some(args) => args.clone(),
        };

        info!(tool = %name, "Tool call");
        let result = self
            .executor
            .execute(name, arguments, &self.ctx)
            .await
            .map_err(|e: ToolError| McpError::invalid_params(e.to_string()))?;
        debug!(tool = %name, is_error = result.is_error, "Tool call finished");

        Ok(json!({
            "content": [{ "type": "text", "text": result.content }],
            "isError": result.is_error
        }))
    }
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut BufWriter<W>, response: &McpResponse) -> Result<()> {
    let json = serde_json::to_string(response).context("Failed to encode MCP response")?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::{Correlator, CorrelatorConfig, CorrelatorHandle, Envelope};
    use crate::mcp::{INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
    use tokio::io::{DuplexStream, Lines};

    fn spawn_correlator() -> CorrelatorHandle {
        let correlator = Correlator::new(CorrelatorConfig::default());
        let handle = correlator.handle();
        tokio::spawn(correlator.run());
        handle
    }

    fn server_for(handle: CorrelatorHandle) -> McpServer {
        McpServer::new(&McpConfig::default(), ToolExecutor::standard(), ToolContext::new(handle))
    }

    async fn request(server: &McpServer, message: Value) -> McpResponse {
        server.handle_message(&message.to_string()).await.unwrap()
    }

    #[tokio::test]
    async fn test_initialize_echoes_supported_version() {
        let server = server_for(spawn_correlator());
        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2024-11-05", "clientInfo": {"name": "test"}}}),
        )
        .await;

        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "figma-bridge");
        assert_eq!(result["serverInfo"]["version"], "1.0.0");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_initialize_unknown_version_falls_back() {
        let server = server_for(spawn_correlator());
        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "1999-01-01"}}),
        )
        .await;
        assert_eq!(resp.result.unwrap()["protocolVersion"], MCP_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = server_for(spawn_correlator());
        let resp = request(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;

        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        let names: Vec<_> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["get_status", "push_svg_to_figma", "push_to_figma"]);
        assert_eq!(tools[2]["inputSchema"]["required"], json!(["design"]));
    }

    #[tokio::test]
    async fn test_tools_call_status() {
        let server = server_for(spawn_correlator());
        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "get_status"}}),
        )
        .await;

        let result = resp.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["type"], "text");
        assert!(result["content"][0]["text"].as_str().unwrap().contains("NOT connected"));
    }

    #[tokio::test]
    async fn test_tools_call_not_connected_is_tool_error() {
        let server = server_for(spawn_correlator());
        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "push_svg_to_figma", "arguments": {"svg": "<svg/>"}}}),
        )
        .await;

        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().starts_with("Error: Figma plugin is not connected"));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server_for(spawn_correlator());

        let resp = server.handle_message("{not json").await.unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);

        let resp = request(&server, json!({"jsonrpc": "2.0", "id": 5})).await;
        assert_eq!(resp.id, json!(5));
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);

        let resp = request(&server, json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"})).await;
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);

        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {"name": "push_to_sketch"}}),
        )
        .await;
        let error = resp.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert!(error.message.contains("push_to_sketch"));
    }

    #[tokio::test]
    async fn test_missing_tool_argument_is_invalid_params() {
        let server = server_for(spawn_correlator());
        let resp = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 8, "method": "tools/call",
                   "params": {"name": "push_svg_to_figma", "arguments": {"name": "Logo"}}}),
        )
        .await;

        assert!(resp.result.is_none());
        let error = resp.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.message, "Invalid argument: Missing required parameter: svg");
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server_for(spawn_correlator());
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_null_id_is_invalid_request() {
        let server = server_for(spawn_correlator());
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_ping() {
        let server = server_for(spawn_correlator());
        let resp = request(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;
        assert_eq!(resp.result, Some(json!({})));
    }

    struct Client {
        input: DuplexStream,
        output: Lines<BufReader<DuplexStream>>,
    }

    impl Client {
        async fn send(&mut self, message: Value) {
            let mut line = message.to_string();
            line.push('\n');
            self.input.write_all(line.as_bytes()).await.unwrap();
        }

        async fn recv(&mut self) -> McpResponse {
            let line = self.output.next_line().await.unwrap().unwrap();
            serde_json::from_str(&line).unwrap()
        }
    }

    fn start_stream_server(server: McpServer) -> (Client, tokio::task::JoinHandle<Result<()>>) {
        let (input, server_in) = tokio::io::duplex(4096);
        let (server_out, output) = tokio::io::duplex(4096);
        let task = tokio::spawn(async move { server.serve(server_in, server_out).await });
        let client = Client {
            input,
            output: BufReader::new(output).lines(),
        };
        (client, task)
    }

    #[tokio::test]
    async fn test_slow_call_does_not_block_status() {
        let handle = spawn_correlator();
        let (plugin_tx, mut plugin_rx) = mpsc::channel(16);
        handle.attach_peer(plugin_tx).await.unwrap();

        let (mut client, _task) = start_stream_server(server_for(handle.clone()));

        client
            .send(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                         "params": {"name": "push_to_figma", "arguments": {"design": "{\"type\":\"FRAME\"}"}}}))
            .await;
        let env: Envelope = serde_json::from_str(&plugin_rx.recv().await.unwrap()).unwrap();

        client
            .send(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "get_status"}}))
            .await;
        let status = client.recv().await;
        assert_eq!(status.id, json!(2));
        assert_eq!(
            status.result.unwrap()["content"][0]["text"],
            "Figma plugin is connected and ready."
        );

        handle
            .deliver(json!({"type": "ack", "requestId": env.request_id, "message": "Created FRAME"}).to_string())
            .await
            .unwrap();
        let pushed = client.recv().await;
        assert_eq!(pushed.id, json!(1));
        assert_eq!(
            pushed.result.unwrap()["content"][0]["text"],
            "Design pushed to Figma successfully. Created FRAME"
        );
    }

    #[tokio::test]
    async fn test_serve_returns_on_eof() {
        let (mut client, task) = start_stream_server(server_for(spawn_correlator()));

        client.send(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})).await;
        client.input.write_all(b"\n").await.unwrap();
        assert_eq!(client.recv().await.id, json!(1));

        drop(client.input);
        task.await.unwrap().unwrap();
        assert!(client.output.next_line().await.unwrap().is_none());
    }
}
