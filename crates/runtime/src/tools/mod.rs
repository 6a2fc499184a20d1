//! Tool registry: catalog and invocation of externally served tools.

mod empty;
pub mod errors;
mod mcp_registry;
mod registry;
mod types;

pub use empty::NoTools;
pub use errors::ToolError;
pub use mcp_registry::{ConnectionState, DEFAULT_CONNECT_TIMEOUT, McpToolRegistry};
pub use registry::ToolRegistry;
pub use types::{
    ContentBlock, InputSchema, SchemaField, ToolCallRequest, ToolCallResult, ToolDescriptor,
};
