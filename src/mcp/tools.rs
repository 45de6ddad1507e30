// Tool trait, registry, and the router tool set
//
// Every tool authenticates a fresh client per call and logs out afterwards
// so the router's single session slot is always released.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::router::{
    expand_ip_shorthand, validate_port, PortForwardingRule, Protocol, RouterClient,
};

/// JSON Schema for tool input parameters
#[derive(Debug, Clone, Serialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Value,
    pub required: Vec<String>,
}

impl ToolInputSchema {
    pub fn new(properties: Value, required: &[&str]) -> Self {
        Self {
            schema_type: "object".to_string(),
            properties,
            required: required.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Tool definition in MCP wire form
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: ToolInputSchema,
}

/// All MCP tools implement this
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> ToolInputSchema;

    async fn execute(&self, input: Value) -> Result<String>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|b| b.as_ref())
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the full router tool set.
pub fn default_registry(config: Arc<Config>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(OpenPortTool {
        config: config.clone(),
    }));
    registry.register(Box::new(ClosePortTool {
        config: config.clone(),
    }));
    registry.register(Box::new(ListPortForwardsTool {
        config: config.clone(),
    }));
    registry.register(Box::new(SessionUrlTool {
        config: config.clone(),
    }));
    registry.register(Box::new(LogoutTool {
        config: config.clone(),
    }));
    registry.register(Box::new(OpenBrowserTool { config }));
    registry
}

/// Fresh authenticated client for one tool call.
pub(crate) async fn authenticated_client(config: &Config) -> Result<RouterClient> {
    let mut client = RouterClient::new(&config.router)?;
    if !client.authenticate().await {
        anyhow::bail!("Failed to authenticate with router");
    }
    Ok(client)
}

fn require_str<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("Missing required parameter '{}'", key))
}

fn require_port(input: &Value, key: &str) -> Result<u16> {
    let port = input
        .get(key)
        .and_then(Value::as_i64)
        .with_context(|| format!("Missing required parameter '{}'", key))?;

    if !validate_port(port) {
        anyhow::bail!("Invalid {}: ports must be between 1 and 65535", key);
    }
    Ok(port as u16)
}

fn port_properties() -> Value {
    json!({
        "name": {"type": "string", "description": "Descriptive name for the port forwarding rule"},
        "local_address": {"type": "string", "description": "Local IP address (full IP or shorthand like \"100\")"},
        "local_port": {"type": "integer", "description": "Local port number"},
        "external_port": {"type": "integer", "description": "External port number"},
        "protocol": {"type": "string", "enum": ["tcp", "udp", "tcp_udp"], "description": "Protocol (default: tcp)"}
    })
}

/// Open a port by creating a forwarding rule
struct OpenPortTool {
    config: Arc<Config>,
}

#[async_trait]
impl Tool for OpenPortTool {
    fn name(&self) -> &str {
        "open_port"
    }

    fn description(&self) -> &str {
        "Open a port on the router by creating a port forwarding rule."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::new(
            port_properties(),
            &["name", "local_address", "local_port", "external_port"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let name = require_str(&input, "name")?;
        let local_address = require_str(&input, "local_address")?;
        let local_port = require_port(&input, "local_port")?;
        let external_port = require_port(&input, "external_port")?;

        let protocol = match input.get("protocol").and_then(Value::as_str) {
            Some(s) => Protocol::parse(s)
                .with_context(|| format!("Invalid protocol '{}' (tcp, udp, or tcp_udp)", s))?,
            None => Protocol::Tcp,
        };

        let local_address = expand_ip_shorthand(local_address);
        let rule = PortForwardingRule::new(name, &local_address, local_port, external_port, protocol);

        let mut client = authenticated_client(&self.config).await?;
        let added = client.add_port_forward(&rule).await;
        client.logout().await;

        if added {
            Ok(format!(
                "Successfully opened port {} -> {}:{} ({})",
                external_port, local_address, local_port, protocol
            ))
        } else {
            anyhow::bail!("Failed to create port forwarding rule")
        }
    }
}

/// Close a port by removing its forwarding rule
struct ClosePortTool {
    config: Arc<Config>,
}

#[async_trait]
impl Tool for ClosePortTool {
    fn name(&self) -> &str {
        "close_port"
    }

    fn description(&self) -> &str {
        "Close a port on the router by removing the port forwarding rule matching the external port."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::new(
            json!({
                "external_port": {"type": "integer", "description": "External port number of the rule to remove"}
            }),
            &["external_port"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let external_port = require_port(&input, "external_port")?;

        let mut client = authenticated_client(&self.config).await?;
        let removed = client.remove_port_forward_by_port(external_port).await;
        client.logout().await;

        if removed {
            Ok(format!(
                "Successfully closed port forwarding rule for port {}",
                external_port
            ))
        } else {
            anyhow::bail!(
                "Failed to remove port forwarding rule for port {} (no match, ambiguous match, or router error)",
                external_port
            )
        }
    }
}

/// List all forwarding rules
struct ListPortForwardsTool {
    config: Arc<Config>,
}

#[async_trait]
impl Tool for ListPortForwardsTool {
    fn name(&self) -> &str {
        "list_port_forwards"
    }

    fn description(&self) -> &str {
        "List all current port forwarding rules on the router."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::new(json!({}), &[])
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        let mut client = authenticated_client(&self.config).await?;
        let rules = client.get_port_forwards().await;
        client.logout().await;

        if rules.is_empty() {
            return Ok("No port forwarding rules found".to_string());
        }

        let mut result = String::from("Current port forwarding rules:\n");
        for rule in &rules {
            let status = if rule.enabled { "enabled" } else { "disabled" };
            result.push_str(&format!(
                "- {}: {} -> {}:{} ({}) [{}]\n",
                rule.name, rule.external_port, rule.local_address, rule.local_port, rule.protocol, status
            ));
        }

        Ok(result.trim_end().to_string())
    }
}

/// Report the router's web UI URL
struct SessionUrlTool {
    config: Arc<Config>,
}

#[async_trait]
impl Tool for SessionUrlTool {
    fn name(&self) -> &str {
        "get_router_session_url"
    }

    fn description(&self) -> &str {
        "Get the router's web interface URL for browser access."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::new(json!({}), &[])
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        // No authentication needed just for the URL
        let client = RouterClient::new(&self.config.router)?;
        Ok(format!("Router web interface: {}", client.get_session_url()))
    }
}

/// Free the router's single session slot
struct LogoutTool {
    config: Arc<Config>,
}

#[async_trait]
impl Tool for LogoutTool {
    fn name(&self) -> &str {
        "logout_router"
    }

    fn description(&self) -> &str {
        "Free up any existing API session to allow browser login."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::new(json!({}), &[])
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        let mut client = authenticated_client(&self.config).await?;
        tracing::info!("Freeing session slot for browser login");
        client.logout().await;
        Ok("Successfully logged out of router".to_string())
    }
}

/// Open the router's web UI in the default browser
struct OpenBrowserTool {
    config: Arc<Config>,
}

#[async_trait]
impl Tool for OpenBrowserTool {
    fn name(&self) -> &str {
        "open_router_in_browser"
    }

    fn description(&self) -> &str {
        "Open the router's web interface in the default browser, freeing any existing API session first."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::new(json!({}), &[])
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        // Best-effort logout so the browser can take the session slot
        match authenticated_client(&self.config).await {
            Ok(mut client) => {
                tracing::info!("Freeing session slot for browser login");
                client.logout().await;
            }
            Err(_) => tracing::info!("No active session to logout"),
        }

        let client = RouterClient::new(&self.config.router)?;
        let session_url = client.get_session_url();

        let opener = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        let status = std::process::Command::new(opener)
            .arg(&session_url)
            .status()
            .with_context(|| format!("Failed to run '{}'", opener))?;

        if !status.success() {
            anyhow::bail!("Failed to open browser; open this URL manually: {}", session_url);
        }

        Ok(format!(
            "Opened router web interface in browser: {}\n\
             Please login with your router password. Note: only one session is allowed at a time.",
            session_url
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_tool_set() {
        let registry = default_registry(Arc::new(Config::default()));
        assert_eq!(registry.len(), 6);

        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "close_port",
                "get_router_session_url",
                "list_port_forwards",
                "logout_router",
                "open_port",
                "open_router_in_browser",
            ]
        );
    }

    #[test]
    fn test_input_schema_wire_form() {
        let registry = default_registry(Arc::new(Config::default()));
        let definition = registry.get("open_port").unwrap().definition();
        let json = serde_json::to_value(&definition).unwrap();

        assert_eq!(json["inputSchema"]["type"], "object");
        assert!(json["inputSchema"]["properties"]["local_port"].is_object());
        assert!(json["inputSchema"]["required"]
            .as_array()
            .unwrap()
            .contains(&json!("external_port")));
    }

    #[tokio::test]
    async fn test_open_port_rejects_invalid_port_before_any_network_use() {
        let registry = default_registry(Arc::new(Config::default()));
        let tool = registry.get("open_port").unwrap();

        let result = tool
            .execute(json!({
                "name": "Web",
                "local_address": "100",
                "local_port": 0,
                "external_port": 8080
            }))
            .await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("between 1 and 65535"));
    }

    #[tokio::test]
    async fn test_open_port_rejects_unknown_protocol() {
        let registry = default_registry(Arc::new(Config::default()));
        let tool = registry.get("open_port").unwrap();

        let result = tool
            .execute(json!({
                "name": "Web",
                "local_address": "100",
                "local_port": 80,
                "external_port": 8080,
                "protocol": "sctp"
            }))
            .await;

        assert!(result.unwrap_err().to_string().contains("Invalid protocol"));
    }

    #[tokio::test]
    async fn test_close_port_requires_external_port() {
        let registry = default_registry(Arc::new(Config::default()));
        let tool = registry.get("close_port").unwrap();

        let result = tool.execute(json!({})).await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Missing required parameter 'external_port'"));
    }
}
