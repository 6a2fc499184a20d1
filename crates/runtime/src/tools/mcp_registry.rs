//! MCP-backed tool registry.

use std::time::Duration;

use mcp::{Server, ServerConfig};
use serde_json::{Map, Value};
use tokio::time::timeout;

use super::{ToolCallResult, ToolDescriptor, ToolError, ToolRegistry};

/// Default bound on handshake and catalog loading.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection lifecycle of an [`McpToolRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Tool registry backed by an MCP server subprocess.
pub struct McpToolRegistry {
    config: ServerConfig,
    connect_timeout: Duration,
    state: ConnectionState,
    server: Option<Server>,
    tools: Vec<ToolDescriptor>,
}

impl McpToolRegistry {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            state: ConnectionState::Disconnected,
            server: None,
            tools: Vec::new(),
        }
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Spawn the server, handshake, then load the catalog.
    ///
    /// Spawn or handshake failure leaves the registry disconnected and is
    /// returned. A catalog that fails to load (or takes longer than the
    /// connect timeout) is logged and leaves the registry connected with no
    /// tools.
    pub async fn connect(&mut self) -> Result<(), ToolError> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }
        self.state = ConnectionState::Connecting;

        let server = match self.open().await {
            Ok(server) => server,
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                tracing::warn!(server = %self.config.name, error = %e, "tool server unavailable");
                return Err(ToolError::Connect(e.to_string()));
            }
        };

        self.tools = match timeout(self.connect_timeout, server.list_tools()).await {
            Ok(Ok(tools)) => unique_descriptors(tools),
            Ok(Err(e)) => {
                tracing::warn!(server = %self.config.name, error = %e, "failed to load tool catalog, continuing without tools");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(server = %self.config.name, timeout = ?self.connect_timeout, "tool catalog timed out, continuing without tools");
                Vec::new()
            }
        };

        tracing::info!(server = %self.config.name, tools = self.tools.len(), "tool registry connected");
        self.server = Some(server);
        self.state = ConnectionState::Connected;
        Ok(())
    }

    async fn open(&self) -> mcp::Result<Server> {
        let server = Server::spawn(self.config.clone()).await?;
        match timeout(self.connect_timeout, server.handshake()).await {
            Ok(result) => {
                result?;
                Ok(server)
            }
            Err(_) => Err(mcp::Error::Timeout(self.connect_timeout)),
        }
    }

    async fn release(&mut self) {
        if let Some(server) = self.server.take() {
            if let Err(e) = server.shutdown().await {
                tracing::debug!(error = %e, "tool server shutdown failed");
            }
        }
        self.tools.clear();
        self.state = ConnectionState::Disconnected;
    }
}

/// Keep the first descriptor of each name.
fn unique_descriptors(tools: Vec<mcp::Tool>) -> Vec<ToolDescriptor> {
    let mut unique: Vec<ToolDescriptor> = Vec::with_capacity(tools.len());
    for tool in tools {
        if unique.iter().any(|t| t.name == tool.name) {
            tracing::warn!(tool = %tool.name, "duplicate tool name in catalog, keeping the first");
            continue;
        }
        unique.push(ToolDescriptor::from(tool));
    }
    unique
}

impl ToolRegistry for McpToolRegistry {
    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn invoke(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolCallResult, ToolError> {
        let server = match (&self.server, self.state) {
            (Some(server), ConnectionState::Connected) => server,
            _ => return Err(ToolError::NotConnected),
        };

        let outcome = server.call_tool(name, Some(Value::Object(arguments))).await;
        match outcome {
            Ok(result) => Ok(result.into()),
            Err(e) if e.is_fatal() => {
                tracing::warn!(tool = name, error = %e, "tool server died, disconnecting");
                self.release().await;
                Err(ToolError::Transport(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            tracing::info!(server = %self.config.name, "disconnecting tool registry");
        }
        self.release().await;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    const INIT_OK: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"fitness"}}}"#;
    const TOOLS_OK: &str = r#"{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo","description":"Echo back the text","inputSchema":{"type":"object","properties":{"text":{"type":"string"}},"required":["text"]}},{"name":"echo","description":"duplicate"}]}}"#;

    /// `sh` server answering the handshake, then one canned line per request.
    fn script(replies: &[&str], tail: &str) -> ServerConfig {
        let mut body = format!("read l; printf '%s\\n' '{INIT_OK}'; read l; ");
        for reply in replies {
            body.push_str(&format!("read l; printf '%s\\n' '{reply}'; "));
        }
        body.push_str(tail);
        ServerConfig::new("fitness", "sh")
            .args(["-c".to_string(), body])
            .request_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn connect_loads_catalog_and_invokes() {
        let call_ok = r#"{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"Echo: hi"}]}}"#;
        let mut registry = McpToolRegistry::new(script(&[TOOLS_OK, call_ok], "sleep 5"));
        assert_eq!(registry.state(), ConnectionState::Disconnected);

        registry.connect().await.unwrap();
        assert!(registry.is_connected());
        assert_eq!(registry.list_tools().len(), 1);
        assert_eq!(registry.list_tools()[0].description, "Echo back the text");

        let mut args = Map::new();
        args.insert("text".into(), json!("hi"));
        let result = registry.invoke("echo", args).await.unwrap();
        assert_eq!(result.render(), "Echo: hi");

        registry.disconnect().await;
        assert!(!registry.is_connected());
        assert!(registry.list_tools().is_empty());
        registry.disconnect().await;
    }

    #[tokio::test]
    async fn catalog_failure_keeps_transport() {
        let list_err = r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"Method not found"}}"#;
        let mut registry = McpToolRegistry::new(script(&[list_err], "sleep 5"));

        registry.connect().await.unwrap();
        assert!(registry.is_connected());
        assert!(registry.list_tools().is_empty());
        registry.disconnect().await;
    }

    #[tokio::test]
    async fn catalog_timeout_keeps_transport() {
        // Never answers tools/list.
        let mut registry = McpToolRegistry::new(script(&[], "sleep 5"))
            .connect_timeout(Duration::from_millis(300));

        registry.connect().await.unwrap();
        assert!(registry.is_connected());
        assert!(registry.list_tools().is_empty());
        registry.disconnect().await;
    }

    #[tokio::test]
    async fn spawn_failure_stays_disconnected() {
        let mut registry =
            McpToolRegistry::new(ServerConfig::new("missing", "/no/such/tool-server"));
        let err = registry.connect().await.unwrap_err();
        assert!(matches!(err, ToolError::Connect(_)));
        assert_eq!(registry.state(), ConnectionState::Disconnected);

        let err = registry.invoke("echo", Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::NotConnected));
    }

    #[tokio::test]
    async fn rejected_call_keeps_connection() {
        let rejected = r#"{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"Invalid arguments: text is required"}],"isError":true}}"#;
        let mut registry = McpToolRegistry::new(script(&[TOOLS_OK, rejected], "sleep 5"));
        registry.connect().await.unwrap();

        let err = registry.invoke("echo", Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Rejected(m) if m.contains("text is required")));
        assert!(registry.is_connected());
        registry.disconnect().await;
    }

    #[tokio::test]
    async fn dead_server_disconnects_registry() {
        // Exits right after answering tools/list.
        let mut registry = McpToolRegistry::new(script(&[TOOLS_OK], "exit 0"));
        registry.connect().await.unwrap();
        assert_eq!(registry.list_tools().len(), 1);

        let err = registry.invoke("echo", Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Transport(_)), "got {err}");
        assert_eq!(registry.state(), ConnectionState::Disconnected);
        assert!(registry.list_tools().is_empty());
    }
}
