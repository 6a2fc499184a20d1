//! Conversation orchestration.
//!
//! A [`Session`] owns the conversation store, the completion backend and the
//! tool registry, and drives one input line at a time through the turn
//! state machine:
//!
//! ```text
//! Idle -> AwaitingInput -> Processing -> [ToolPending] -> Presenting -> AwaitingInput ... -> Stopped
//! ```
//!
//! Every line yields an [`Outcome`]; failures are values, never early returns.

use std::fmt;

use storage::{ConversationStore, Turn};
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::{CompletionError, CompletionOptions, LlmBackend};
use crate::command::{COMMANDS, Command, CommandHelp};
use crate::directive;
use crate::prompt::{DEFAULT_HISTORY_WINDOW, DEFAULT_SYSTEM_PROMPT, PromptBuilder};
use crate::tools::{ToolCallRequest, ToolDescriptor, ToolError, ToolRegistry};

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reachability of the two collaborators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub model: bool,
    pub tools: bool,
}

/// Run state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub id: SessionId,
    pub running: bool,
    pub current_model: String,
    pub connection: ConnectionStatus,
}

/// Where a session is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingInput,
    Processing,
    ToolPending,
    Presenting,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub system_prompt: String,
    pub history_window: usize,
    pub options: CompletionOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
            options: CompletionOptions::default(),
        }
    }
}

/// What happened to a tool call requested during a turn.
#[derive(Debug, Clone)]
pub enum ToolActivity {
    Completed { name: String },
    Failed { name: String, error: ToolError },
}

/// An assistant reply, exactly as recorded in history.
#[derive(Debug, Clone)]
pub struct Reply {
    pub content: String,
    pub tool: Option<ToolActivity>,
}

/// Result of a slash command.
#[derive(Debug, Clone)]
pub enum CommandOutput {
    Help(&'static [CommandHelp]),
    Cleared { removed: usize },
    History(Vec<Turn>),
    Exit,
    Unknown(String),
}

/// Result of handling one input line.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Blank input. Nothing was recorded.
    Rejected,
    Reply(Reply),
    /// The completion request failed. The user turn stays in history.
    Failed(CompletionError),
    Command(CommandOutput),
    /// The session was already stopped.
    Stopped,
}

/// A conversation session.
pub struct Session<B, R> {
    state: SessionState,
    phase: Phase,
    store: ConversationStore,
    prompt: PromptBuilder,
    options: CompletionOptions,
    backend: B,
    registry: R,
}

impl<B: LlmBackend, R: ToolRegistry> Session<B, R> {
    /// Create a session around an already connected (or never connected) registry.
    pub fn new(backend: B, registry: R, config: SessionConfig) -> Self {
        let state = SessionState {
            id: SessionId::new(),
            running: false,
            current_model: backend.model().to_string(),
            connection: ConnectionStatus {
                model: false,
                tools: registry.is_connected(),
            },
        };
        Self {
            state,
            phase: Phase::Idle,
            store: ConversationStore::new(),
            prompt: PromptBuilder::new(config.system_prompt).with_window(config.history_window),
            options: config.options,
            backend,
            registry,
        }
    }

    /// Record the result of a model server health check.
    pub fn with_model_status(mut self, reachable: bool) -> Self {
        self.state.connection.model = reachable;
        self
    }

    /// Mark the session running and ready for input.
    pub fn start(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        self.state.running = true;
        tracing::info!(session = %self.state.id, model = %self.state.current_model, "session started");
        self.transition(Phase::AwaitingInput);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Recorded turns, oldest first.
    pub fn history(&self) -> Vec<Turn> {
        self.store.snapshot()
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        self.registry.list_tools()
    }

    /// Process one line of user input.
    ///
    /// Dropping the returned future abandons the turn; call [`Session::stop`]
    /// afterwards to release the registry.
    pub async fn handle_line(&mut self, line: &str) -> Outcome {
        let span = tracing::info_span!("session", id = %self.state.id);
        self.dispatch(line).instrument(span).await
    }

    async fn dispatch(&mut self, line: &str) -> Outcome {
        match self.phase {
            Phase::Stopped => return Outcome::Stopped,
            Phase::Idle => self.start(),
            _ => {}
        }

        let message = line.trim();
        if message.is_empty() {
            return Outcome::Rejected;
        }
        match Command::parse(message) {
            Some(command) => Outcome::Command(self.execute(command).await),
            None => self.converse(message).await,
        }
    }

    async fn execute(&mut self, command: Command) -> CommandOutput {
        tracing::debug!(?command, "command");
        match command {
            Command::Help => CommandOutput::Help(COMMANDS),
            Command::Clear => CommandOutput::Cleared {
                removed: self.store.clear(),
            },
            Command::History => CommandOutput::History(self.store.snapshot()),
            Command::Exit => {
                self.stop().await;
                CommandOutput::Exit
            }
            Command::Unknown(line) => CommandOutput::Unknown(line),
        }
    }

    async fn converse(&mut self, message: &str) -> Outcome {
        self.transition(Phase::Processing);

        let tools = self
            .registry
            .is_connected()
            .then(|| self.registry.list_tools());
        let prompt = self
            .prompt
            .build(self.store.recent(self.prompt.window()), message, tools);
        self.store.append(Turn::user(message));

        let text = match self.backend.complete(&prompt, &self.options).await {
            Ok(text) => {
                self.state.connection.model = true;
                text
            }
            Err(e) => {
                if e.is_connectivity() {
                    self.state.connection.model = false;
                }
                tracing::warn!(error = %e, "completion failed");
                self.present();
                return Outcome::Failed(e);
            }
        };

        let call = if self.registry.is_connected() {
            directive::parse(&text)
        } else {
            None
        };
        let reply = match call {
            Some(call) => self.run_tool(&text, call).await,
            None => Reply {
                content: text,
                tool: None,
            },
        };

        self.store.append(Turn::assistant(reply.content.clone()));
        self.present();
        Outcome::Reply(reply)
    }

    async fn run_tool(&mut self, text: &str, call: ToolCallRequest) -> Reply {
        self.transition(Phase::ToolPending);
        tracing::debug!(tool = %call.name, "invoking tool");

        let narration = directive::strip_directive(text);
        let result = self.registry.invoke(&call.name, call.arguments).await;
        self.state.connection.tools = self.registry.is_connected();

        let name = call.name;
        let (notice, activity) = match result {
            Ok(result) => (
                format!("Tool `{name}` returned:\n{}", result.render()),
                ToolActivity::Completed { name },
            ),
            Err(error) => {
                tracing::warn!(tool = %name, error = %error, "tool call failed");
                (
                    format!("Tool `{name}` failed: {error}"),
                    ToolActivity::Failed { name, error },
                )
            }
        };

        let content = if narration.is_empty() {
            notice
        } else {
            format!("{narration}\n\n{notice}")
        };
        Reply {
            content,
            tool: Some(activity),
        }
    }

    /// Stop the session and release the tool registry. Idempotent.
    pub async fn stop(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        self.registry.disconnect().await;
        self.state.running = false;
        self.state.connection.tools = false;
        self.transition(Phase::Stopped);
        tracing::info!(session = %self.state.id, turns = self.store.len(), "session stopped");
    }

    fn present(&mut self) {
        self.transition(Phase::Presenting);
        self.transition(Phase::AwaitingInput);
    }

    fn transition(&mut self, next: Phase) {
        tracing::debug!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }
}
