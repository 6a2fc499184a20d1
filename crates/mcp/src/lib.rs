//! MCP (Model Context Protocol) client library.
//!
//! A minimal client for tool servers that speak line-delimited JSON-RPC over
//! a child process's stdio.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Server, ServerConfig};
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = ServerConfig::new("fitness", "node").args(["dist/index.js"]);
//!
//! let server = Server::spawn(config).await?;
//! server.handshake().await?;
//!
//! for tool in server.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let result = server
//!     .call_tool("echo", Some(serde_json::json!({ "text": "hi" })))
//!     .await?;
//! println!("{}", result.text());
//!
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod protocol;
mod server;

pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcMessage, JsonRpcRequest, ListToolsResult, PROTOCOL_VERSION, RequestId, ServerInfo,
    Tool, ToolContent,
};
pub use server::{DEFAULT_TIMEOUT, MAX_OUTPUT_SIZE, Server, ServerConfig};
