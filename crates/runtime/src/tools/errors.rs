use std::time::Duration;

use thiserror::Error;

/// Errors from the tool registry.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("tool registry is not connected")]
    NotConnected,
    #[error("could not connect to tool server: {0}")]
    Connect(String),
    /// The tool server went away; the registry is now disconnected.
    #[error("tool server connection lost: {0}")]
    Transport(String),
    /// The server refused or failed the call (unknown tool, bad arguments, tool-side error).
    #[error("{0}")]
    Rejected(String),
    #[error("timeout after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl From<mcp::Error> for ToolError {
    fn from(e: mcp::Error) -> Self {
        match e {
            mcp::Error::Timeout(after) => Self::Timeout(after),
            mcp::Error::NotInitialized => Self::NotConnected,
            e if e.is_fatal() => Self::Transport(e.to_string()),
            mcp::Error::ToolFailed(message) => Self::Rejected(message),
            mcp::Error::JsonRpc(rpc) => Self::Rejected(rpc.message),
            e => Self::Rejected(e.to_string()),
        }
    }
}
