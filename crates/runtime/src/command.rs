//! Slash commands typed at the input prompt.

/// Prefix that routes a line to the command interpreter.
pub const COMMAND_PREFIX: char = '/';

/// A recognised control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    History,
    Exit,
    /// Anything else starting with the prefix. Holds the trimmed line.
    Unknown(String),
}

/// Name and one-line summary of a command, for `/help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHelp {
    pub name: &'static str,
    pub summary: &'static str,
}

pub const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        name: "/help",
        summary: "Show this help message",
    },
    CommandHelp {
        name: "/clear",
        summary: "Clear the conversation history",
    },
    CommandHelp {
        name: "/history",
        summary: "Show the conversation history",
    },
    CommandHelp {
        name: "/exit",
        summary: "Exit the chat",
    },
];

impl Command {
    /// Interpret `line` as a command.
    ///
    /// Returns `None` when the trimmed line does not start with `/`, in which
    /// case it is ordinary chat input. Matching is case-insensitive and
    /// applies to the whole line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with(COMMAND_PREFIX) {
            return None;
        }
        let command = match line.to_lowercase().as_str() {
            "/help" => Self::Help,
            "/clear" => Self::Clear,
            "/history" => Self::History,
            "/exit" => Self::Exit,
            _ => Self::Unknown(line.to_string()),
        };
        Some(command)
    }
}
