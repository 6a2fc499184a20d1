//! Prompt assembly.
//!
//! The prompt is a plain transcript: system preamble, optional tool catalog,
//! the most recent turns with speaker labels, the new message, and a trailing
//! `Assistant:` cue. Same inputs always give the same bytes.

use storage::{Role, Turn};

use crate::directive::DIRECTIVE_MARKER;
use crate::tools::ToolDescriptor;

/// Default number of past turns included in a prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

pub const DEFAULT_SYSTEM_PROMPT: &str = "The following is a friendly conversation between a human and an AI assistant.\n\
The assistant is helpful, creative, clever and very friendly.";

const USER_LABEL: &str = "User";
const ASSISTANT_LABEL: &str = "Assistant";

/// Builds completion prompts from history.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
    window: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptBuilder {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// Number of past turns to keep. Clamped to at least one.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Assemble the prompt. Turns older than the window are dropped.
    ///
    /// The catalog block is emitted only for a non-empty `tools` slice.
    pub fn build(&self, history: &[Turn], message: &str, tools: Option<&[ToolDescriptor]>) -> String {
        let mut prompt = String::new();
        prompt.push_str(self.system.trim_end());
        prompt.push('\n');

        if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
            prompt.push('\n');
            prompt.push_str(&tool_catalog(tools));
        }
        prompt.push('\n');

        let start = history.len().saturating_sub(self.window);
        for turn in &history[start..] {
            prompt.push_str(&format!("{}: {}\n", label(turn.role), turn.content));
        }
        prompt.push_str(&format!("{USER_LABEL}: {message}\n{ASSISTANT_LABEL}:"));
        prompt
    }
}

fn label(role: Role) -> &'static str {
    match role {
        Role::User => USER_LABEL,
        Role::Assistant => ASSISTANT_LABEL,
    }
}

/// Catalog block listing each tool and the directive syntax.
pub fn tool_catalog(tools: &[ToolDescriptor]) -> String {
    let mut block = String::from("Available tools:\n");
    for tool in tools {
        block.push_str(&format!("- {}: {}\n", tool.name, tool.description));
        if !tool.input_schema.is_empty() {
            let params = tool.input_schema.field_names().join(", ");
            block.push_str(&format!("  Parameters: {params}\n"));
        }
    }
    block.push_str(&format!(
        "To use a tool, reply with exactly this format: {DIRECTIVE_MARKER} {{\"name\": \"<tool name>\", \"arguments\": {{...}}}}\n"
    ));
    block
}
