//! MCP error types.

use std::time::Duration;

use crate::protocol::JsonRpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to spawn server `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("server not initialized")]
    NotInitialized,

    #[error("server exited unexpectedly")]
    ServerExited,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] JsonRpcError),

    #[error("tool reported an error: {0}")]
    ToolFailed(String),

    #[error("output too large: {size} bytes (max {max})")]
    OutputTooLarge { size: usize, max: usize },
}

impl Error {
    /// Whether the server process can no longer be talked to.
    ///
    /// Anything else leaves the pipe usable for the next request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::Io(_) | Self::ServerExited)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(Error::ServerExited.is_fatal());
        assert!(Error::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_fatal());
        assert!(!Error::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(!Error::ToolFailed("nope".into()).is_fatal());
        let rpc = JsonRpcError {
            code: -32602,
            message: "bad params".into(),
            data: None,
        };
        assert!(!Error::from(rpc).is_fatal());
    }
}
