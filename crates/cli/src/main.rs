mod config;
mod error;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use runtime::{
    Command, CommandOutput, McpToolRegistry, NoTools, OllamaBackend, Outcome, Session,
    ToolActivity, ToolRegistry, is_installed,
};
use storage::{Role, Turn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const DEFAULT_LOG_FILTER: &str = "warn";
const VERBOSE_LOG_FILTER: &str = "info,runtime=debug,mcp=debug";

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Chat with a local model that can call MCP tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Model to use (overrides model.name)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature, 0.0 to 2.0
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Base URL of the Ollama server
    #[arg(short, long)]
    url: Option<String>,

    /// Do not launch the configured tool server
    #[arg(long)]
    no_tools: bool,

    /// Log state transitions and tool traffic to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: ./parley.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.model.temperature = temperature;
        }
        if let Some(url) = &self.url {
            config.model.base_url = url.clone();
        }
        if self.no_tools {
            config.tools = None;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    };
    // A pending stdin read cannot be cancelled; don't wait for it on shutdown.
    std::process::exit(code);
}

fn init_logging(verbose: bool) {
    let fallback = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::discover(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let backend = config.backend();
    check_model_server(&backend, &config.model.name).await?;

    match &config.tools {
        Some(tools) => {
            let mut registry = McpToolRegistry::new(tools.server_config())
                .connect_timeout(tools.connect_timeout());
            if let Err(e) = registry.connect().await {
                eprintln!("Warning: {e}. Continuing without tools.");
            }
            chat(backend, registry, &config).await
        }
        None => chat(backend, NoTools, &config).await,
    }
}

async fn check_model_server(backend: &OllamaBackend, model: &str) -> Result<()> {
    let installed = backend
        .installed_models()
        .await
        .map_err(|e| Error::ModelServer {
            url: backend.base_url().to_string(),
            source: e.into(),
        })?;

    if !is_installed(&installed, model) {
        tracing::warn!(model, "model not installed");
        eprintln!("Warning: model '{model}' is not installed. Run `ollama pull {model}` first.");
    }
    Ok(())
}

async fn chat<R: ToolRegistry>(backend: OllamaBackend, registry: R, config: &Config) -> Result<()> {
    let base_url = backend.base_url().to_string();
    let mut session = Session::new(backend, registry, config.session_config()).with_model_status(true);
    print_banner(&session, &base_url);
    session.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signal::ctrl_c() => {
                println!();
                break;
            }
        };
        // End of input behaves like /exit.
        let Some(line) = line else {
            println!();
            break;
        };

        let spinner = expects_reply(&line).then(|| thinking_spinner(&session.state().current_model));
        let outcome = tokio::select! {
            outcome = session.handle_line(&line) => outcome,
            _ = signal::ctrl_c() => {
                if let Some(spinner) = &spinner {
                    spinner.finish_and_clear();
                }
                println!("\nInterrupted.");
                break;
            }
        };
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        if !render(outcome) {
            break;
        }
    }

    session.stop().await;
    println!("Goodbye!");
    Ok(())
}

fn expects_reply(line: &str) -> bool {
    !line.trim().is_empty() && Command::parse(line).is_none()
}

fn thinking_spinner(model: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("{model} is thinking..."));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_banner<B: runtime::LlmBackend, R: ToolRegistry>(session: &Session<B, R>, base_url: &str) {
    let state = session.state();
    println!("parley v{}", env!("CARGO_PKG_VERSION"));
    println!("Model: {} @ {base_url}", state.current_model);
    if state.connection.tools {
        let names: Vec<_> = session.tools().iter().map(|t| t.name.as_str()).collect();
        if names.is_empty() {
            println!("Tools: connected, none available");
        } else {
            println!("Tools: {}", names.join(", "));
        }
    } else {
        println!("Tools: none");
    }
    println!("Type /help for commands, /exit to quit.\n");
}

/// Print the outcome of one line. Returns false when the loop should end.
fn render(outcome: Outcome) -> bool {
    match outcome {
        Outcome::Rejected => println!("Please enter a message."),
        Outcome::Reply(reply) => {
            match &reply.tool {
                Some(ToolActivity::Completed { name }) => println!("[tool] {name}: ok"),
                Some(ToolActivity::Failed { name, .. }) => println!("[tool] {name}: failed"),
                None => {}
            }
            println!("Assistant: {}\n", reply.content);
        }
        Outcome::Failed(e) => eprintln!("Error: {e}\n"),
        Outcome::Command(output) => return render_command(output),
        Outcome::Stopped => return false,
    }
    true
}

fn render_command(output: CommandOutput) -> bool {
    match output {
        CommandOutput::Help(commands) => {
            println!("\nAvailable commands:");
            for command in commands {
                println!("  {:<10} {}", command.name, command.summary);
            }
            println!();
        }
        CommandOutput::Cleared { removed } => {
            println!("Conversation history cleared ({removed} messages).\n");
        }
        CommandOutput::History(turns) => print_history(&turns),
        CommandOutput::Unknown(line) => {
            println!("Unknown command: {line}");
            println!("Type /help to see the available commands.\n");
        }
        CommandOutput::Exit => return false,
    }
    true
}

fn print_history(turns: &[Turn]) {
    if turns.is_empty() {
        println!("No conversation history yet.\n");
        return;
    }
    println!("\nConversation history:");
    println!("{}", "-".repeat(50));
    for turn in turns {
        println!("{}", history_line(turn));
    }
    println!("{}\n", "-".repeat(50));
}

fn history_line(turn: &Turn) -> String {
    let time = turn.timestamp.with_timezone(&Local).format("%H:%M:%S");
    let speaker = match turn.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    format!("[{time}] {speaker}: {}", turn.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "parley", "-m", "llama3.2", "-t", "0.1", "--url", "http://gpu:11434", "--no-tools",
        ]);
        let mut config = Config::parse("[tools]\ncommand = \"node\"").unwrap();
        cli.apply(&mut config);

        assert_eq!(config.model.name, "llama3.2");
        assert_eq!(config.model.temperature, 0.1);
        assert_eq!(config.model.base_url, "http://gpu:11434");
        assert!(config.tools.is_none());
    }

    #[test]
    fn no_flags_keep_config() {
        let cli = Cli::parse_from(["parley"]);
        let mut config = Config::parse("[model]\nname = \"qwen3\"").unwrap();
        cli.apply(&mut config);
        assert_eq!(config.model.name, "qwen3");
        assert!(!cli.verbose);
    }

    #[test]
    fn spinner_only_for_model_input() {
        assert!(expects_reply("hello"));
        assert!(!expects_reply("  "));
        assert!(!expects_reply("/history"));
        assert!(!expects_reply("/nope"));
    }

    #[test]
    fn history_line_format() {
        let line = history_line(&Turn::user("hello"));
        assert!(line.starts_with('['));
        assert_eq!(&line[9..], "] You: hello");
        assert!(history_line(&Turn::assistant("hi")).ends_with("] Assistant: hi"));
    }

    #[test]
    fn exit_ends_loop() {
        assert!(!render(Outcome::Command(CommandOutput::Exit)));
        assert!(!render(Outcome::Stopped));
        assert!(render(Outcome::Rejected));
    }
}
