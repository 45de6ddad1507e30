// MCP server over stdio
//
// Line-delimited JSON-RPC 2.0 on stdin/stdout. Logs go to stderr so the
// framing on stdout stays clean.

use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::protocol::{
    JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION,
};
use super::tools::{authenticated_client, default_registry, ToolRegistry};
use crate::config::Config;

pub const STATUS_RESOURCE_URI: &str = "router://status";
pub const CONFIG_RESOURCE_URI: &str = "router://config";

pub struct McpServer {
    config: Arc<Config>,
    registry: ToolRegistry,
}

impl McpServer {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        Self {
            registry: default_registry(config.clone()),
            config,
        }
    }

    /// Serve requests from stdin until EOF.
    pub async fn serve(self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        let mut stdout = tokio::io::stdout();

        tracing::info!(tools = self.registry.len(), "MCP server listening on stdio");

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Invalid JSON-RPC request: {}", e),
                )),
            };

            if let Some(response) = response {
                let serialized = serde_json::to_string(&response)?;
                stdout.write_all(serialized.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        tracing::info!("stdin closed, MCP server shutting down");
        Ok(())
    }

    /// Handle a single request. Notifications yield no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!(method = %request.method, "MCP request");

        let Some(id) = request.id else {
            // Notification; nothing expects a reply
            if request.method != "notifications/initialized" {
                tracing::debug!(method = %request.method, "Ignoring notification");
            }
            return None;
        };

        Some(match self.dispatch(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err((code, message)) => JsonRpcResponse::error(id, code, message),
        })
    }

    async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, (i32, String)> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {},
                    "resources": {}
                },
                "serverInfo": {
                    "name": "sagectl",
                    "version": env!("CARGO_PKG_VERSION")
                }
            })),

            "ping" => Ok(json!({})),

            "tools/list" => Ok(json!({ "tools": self.registry.definitions() })),

            "tools/call" => self.call_tool(params).await,

            "resources/list" => Ok(json!({
                "resources": [
                    {
                        "uri": STATUS_RESOURCE_URI,
                        "name": "Router connection status",
                        "mimeType": "text/plain"
                    },
                    {
                        "uri": CONFIG_RESOURCE_URI,
                        "name": "Router configuration",
                        "mimeType": "text/plain"
                    }
                ]
            })),

            "resources/read" => self.read_resource(params).await,

            _ => Err((METHOD_NOT_FOUND, format!("Unknown method: {}", method))),
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, (i32, String)> {
        let params = params.unwrap_or(Value::Null);
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| (INVALID_PARAMS, "Missing tool name".to_string()))?;

        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| (INVALID_PARAMS, format!("Unknown tool: {}", name)))?;

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        // Tool failures are tool results, not protocol errors
        match tool.execute(arguments).await {
            Ok(text) => Ok(json!({
                "content": [{"type": "text", "text": text}],
                "isError": false
            })),
            Err(e) => {
                tracing::error!(tool = name, error = %e, "Tool execution failed");
                Ok(json!({
                    "content": [{"type": "text", "text": format!("Error: {:#}", e)}],
                    "isError": true
                }))
            }
        }
    }

    async fn read_resource(&self, params: Option<Value>) -> Result<Value, (i32, String)> {
        let params = params.unwrap_or(Value::Null);
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| (INVALID_PARAMS, "Missing resource uri".to_string()))?;

        let text = match uri {
            STATUS_RESOURCE_URI => match authenticated_client(&self.config).await {
                Ok(mut client) => {
                    client.logout().await;
                    "Router connection successful".to_string()
                }
                Err(_) => "Router connection failed - check network/credentials".to_string(),
            },
            CONFIG_RESOURCE_URI => {
                let router = &self.config.router;
                format!(
                    "Router: {}:{}\nBase URL: http://{}:{}",
                    router.host, router.port, router.host, router.port
                )
            }
            other => return Err((INVALID_PARAMS, format!("Unknown resource: {}", other))),
        };

        Ok(json!({
            "contents": [{"uri": uri, "mimeType": "text/plain", "text": text}]
        }))
    }
}
