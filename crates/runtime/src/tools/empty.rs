//! Registry used when no tool server is configured.

use serde_json::{Map, Value};

use super::{ToolCallResult, ToolDescriptor, ToolError, ToolRegistry};

/// A registry that is never connected and has no tools.
#[derive(Debug, Default)]
pub struct NoTools;

impl ToolRegistry for NoTools {
    fn is_connected(&self) -> bool {
        false
    }

    fn list_tools(&self) -> &[ToolDescriptor] {
        &[]
    }

    async fn invoke(
        &mut self,
        _name: &str,
        _arguments: Map<String, Value>,
    ) -> Result<ToolCallResult, ToolError> {
        Err(ToolError::NotConnected)
    }

    async fn disconnect(&mut self) {}
}
