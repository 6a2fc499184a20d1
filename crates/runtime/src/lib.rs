//! Parley runtime: the tool-augmented conversation loop.
//!
//! This crate turns one line of user input into one assistant reply, letting
//! the model call external tools along the way.
//!
//! # Overview
//!
//! - **Session**: owns the conversation store and drives each turn through
//!   prompt building, completion, tool-call detection and tool invocation.
//! - **LlmBackend**: "prompt in, text out" over an Ollama-compatible server.
//! - **ToolRegistry**: catalog and invocation of tools served by an MCP
//!   subprocess, or [`NoTools`] when none is configured.
//! - **directive**: detects `TOOLCALL: {...}` requests in model output.
//!
//! # Example
//!
//! ```no_run
//! use runtime::{NoTools, OllamaBackend, Outcome, Session, SessionConfig};
//!
//! # async fn example() {
//! let backend = OllamaBackend::builder("http://localhost:11434", "deepseek-r1").build();
//! let mut session = Session::new(backend, NoTools, SessionConfig::default());
//! session.start();
//!
//! if let Outcome::Reply(reply) = session.handle_line("Hello!").await {
//!     println!("{}", reply.content);
//! }
//! session.stop().await;
//! # }
//! ```

mod backend;
mod command;
pub mod directive;
mod error;
mod prompt;
mod session;
pub mod tools;

pub use backend::{
    CompletionError, CompletionOptions, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    LlmBackend, OllamaBackend, OllamaBackendBuilder, REASONING_CLOSE, REASONING_OPEN,
    is_installed, strip_reasoning,
};

pub use command::{COMMAND_PREFIX, COMMANDS, Command, CommandHelp};

pub use error::{Error, Result};

pub use prompt::{DEFAULT_HISTORY_WINDOW, DEFAULT_SYSTEM_PROMPT, PromptBuilder, tool_catalog};

pub use session::{
    CommandOutput, ConnectionStatus, Outcome, Phase, Reply, Session, SessionConfig, SessionId,
    SessionState, ToolActivity,
};

pub use tools::{
    ConnectionState, ContentBlock, DEFAULT_CONNECT_TIMEOUT, InputSchema, McpToolRegistry,
    NoTools, SchemaField, ToolCallRequest, ToolCallResult, ToolDescriptor, ToolError,
    ToolRegistry,
};
