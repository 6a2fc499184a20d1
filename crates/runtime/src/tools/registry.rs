//! Tool registry trait.

use std::future::Future;

use serde_json::{Map, Value};

use super::{ToolCallResult, ToolDescriptor, ToolError};

/// Trait for tool registries.
///
/// This is the boundary between the conversation loop and side effects.
/// Argument validation belongs to the server behind the registry; the
/// registry forwards calls as-is.
pub trait ToolRegistry: Send {
    /// True once the transport is up, whether or not a catalog was loaded.
    fn is_connected(&self) -> bool;

    /// Cached catalog. Never re-queries the server.
    fn list_tools(&self) -> &[ToolDescriptor];

    /// Invoke `name` with `arguments`. Fails with [`ToolError::NotConnected`]
    /// when the registry is not connected.
    fn invoke(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = Result<ToolCallResult, ToolError>> + Send;

    /// Release the connection. Safe to call repeatedly or when never connected.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;
}
