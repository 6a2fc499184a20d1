//! MCP server process management (spawn, handshake, requests, lifecycle).

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcMessage,
    JsonRpcRequest, ListToolsResult, RequestId, Tool,
};

/// Default timeout for a single request/response exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum size of one response line (1MB).
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// How to launch an MCP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// Handle to a running MCP server speaking line-delimited JSON-RPC on stdio.
pub struct Server {
    config: ServerConfig,
    process: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    next_id: AtomicI64,
    initialized: AtomicBool,
}

impl Server {
    /// Spawn the server process. No protocol traffic happens yet.
    pub async fn spawn(config: ServerConfig) -> Result<Self> {
        let spawn_error = |source: std::io::Error| Error::Spawn {
            command: config.command.clone(),
            source,
        };

        let mut process = Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| spawn_error(std::io::Error::other("failed to capture stdin")))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| spawn_error(std::io::Error::other("failed to capture stdout")))?;

        tracing::debug!(server = %config.name, command = %config.command, "spawned MCP server");

        Ok(Self {
            config,
            process: Mutex::new(process),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            next_id: AtomicI64::new(1),
            initialized: AtomicBool::new(false),
        })
    }

    /// Run the `initialize` handshake and announce readiness.
    pub async fn handshake(&self) -> Result<InitializeResult> {
        let result: InitializeResult = self
            .request("initialize", Some(InitializeParams::default()))
            .await?;
        self.notify("notifications/initialized").await?;
        self.initialized.store(true, Ordering::SeqCst);

        if let Some(info) = &result.server_info {
            tracing::info!(server = %self.config.name, remote = %info.name, "MCP handshake complete");
        }
        Ok(result)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Query the server's tool catalog.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        self.ensure_initialized()?;
        let result: ListToolsResult = self.request("tools/list", None::<()>).await?;
        Ok(result.tools)
    }

    /// Call a tool by name. A result flagged `isError` becomes [`Error::ToolFailed`].
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Value>,
    ) -> Result<CallToolResult> {
        self.ensure_initialized()?;

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result: CallToolResult = self.request("tools/call", Some(params)).await?;

        if result.is_error {
            return Err(Error::ToolFailed(result.text()));
        }
        Ok(result)
    }

    /// Terminate the server process.
    pub async fn shutdown(self) -> Result<()> {
        let mut process = self.process.into_inner();
        if let Err(e) = process.kill().await {
            tracing::debug!(server = %self.config.name, error = %e, "kill failed, process likely gone");
        }
        tracing::info!(server = %self.config.name, "MCP server stopped");
        Ok(())
    }

    // --- Internal methods ---

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let id = self.next_request_id();
        let mut request = JsonRpcRequest::new(id.clone(), method);
        if let Some(p) = params {
            request = request.with_params(p)?;
        }

        tracing::debug!(server = %self.config.name, ?id, method, "sending request");
        self.send(&request).await?;

        let limit = self.config.request_timeout;
        let response = timeout(limit, self.read_response(&id))
            .await
            .map_err(|_| Error::Timeout(limit))??;

        let value = response.into_result()?;
        Ok(serde_json::from_value(value)?)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        self.send(&JsonRpcRequest::notification(method)).await
    }

    async fn send(&self, message: &JsonRpcRequest) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Read lines until the response to `id` shows up.
    ///
    /// Notifications, server-initiated requests, stale responses from
    /// earlier timed-out requests and non-JSON noise (invalid UTF-8
    /// included) are skipped.
    async fn read_response(&self, id: &RequestId) -> Result<JsonRpcMessage> {
        let mut stdout = self.stdout.lock().await;
        loop {
            let mut line = Vec::new();
            let read = (&mut *stdout)
                .take(MAX_OUTPUT_SIZE as u64 + 1)
                .read_until(b'\n', &mut line)
                .await?;
            if read == 0 {
                return Err(Error::ServerExited);
            }

            // The unread tail of an oversized line is skipped as noise later.
            if line.len() > MAX_OUTPUT_SIZE {
                return Err(Error::OutputTooLarge {
                    size: line.len(),
                    max: MAX_OUTPUT_SIZE,
                });
            }

            let line = String::from_utf8_lossy(&line);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcMessage>(trimmed) {
                Ok(message) if message.answers(id) => return Ok(message),
                Ok(message) => {
                    tracing::debug!(server = %self.config.name, id = ?message.id, method = ?message.method, "skipping unrelated message");
                }
                Err(e) => {
                    tracing::warn!(server = %self.config.name, error = %e, "ignoring non JSON-RPC output");
                }
            }
        }
    }
}
