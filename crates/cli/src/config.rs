//! Configuration loading from parley.toml.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mcp::ServerConfig;
use runtime::{
    CompletionOptions, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HISTORY_WINDOW,
    DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, OllamaBackend, SessionConfig,
};
use serde::Deserialize;

/// File picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "parley.toml";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    /// Tool server to launch. Absent means the session runs without tools.
    pub tools: Option<ToolsConfig>,
}

/// Model server settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub base_url: String,
    pub temperature: f32,
    /// Request a streamed response and accumulate it.
    pub stream: bool,
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            stream: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of past turns included in each prompt.
    pub history_window: usize,
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// MCP tool server launched as a subprocess.
#[derive(Debug, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_server_name")]
    pub name: String,

    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Bound on handshake and catalog loading.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_server_name() -> String {
    "tools".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

impl ToolsConfig {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(&self.name, &self.command)
            .args(self.args.iter().cloned())
            .env(self.env.clone())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Config {
    /// Load `explicit` if given (it must exist), otherwise `parley.toml` if
    /// present, otherwise defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) if !path.exists() => Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check value ranges. Run after command-line overrides are applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !TEMPERATURE_RANGE.contains(&self.model.temperature) {
            return Err(ConfigError::Temperature(self.model.temperature));
        }
        if self.chat.history_window == 0 {
            return Err(ConfigError::HistoryWindow);
        }
        if self.tools.as_ref().is_some_and(|t| t.command.trim().is_empty()) {
            return Err(ConfigError::EmptyToolCommand);
        }
        Ok(())
    }

    pub fn backend(&self) -> OllamaBackend {
        OllamaBackend::builder(&self.model.base_url, &self.model.name)
            .stream(self.model.stream)
            .request_timeout(Duration::from_secs(self.model.request_timeout_secs))
            .build()
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            system_prompt: self.chat.system_prompt.clone(),
            history_window: self.chat.history_window,
            options: CompletionOptions {
                temperature: self.model.temperature,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("temperature must be between 0.0 and 2.0, got {0}")]
    Temperature(f32),

    #[error("chat.history_window must be at least 1")]
    HistoryWindow,

    #[error("tools.command must not be empty")]
    EmptyToolCommand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.model.name, "deepseek-r1");
        assert_eq!(config.model.base_url, "http://localhost:11434");
        assert_eq!(config.model.temperature, 0.7);
        assert!(config.model.stream);
        assert_eq!(config.model.request_timeout_secs, 300);
        assert_eq!(config.chat.history_window, 10);
        assert!(config.tools.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn full_file() {
        let config = Config::parse(
            r#"
            [model]
            name = "llama3.2"
            base_url = "http://gpu-box:11434"
            temperature = 0.2
            stream = false

            [chat]
            history_window = 4
            system_prompt = "Be terse."

            [tools]
            command = "node"
            args = ["build/index.js"]
            env = { API_URL = "http://localhost:3000" }
            connect_timeout_secs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.model.name, "llama3.2");
        assert!(!config.model.stream);
        assert_eq!(config.model.request_timeout_secs, 300);

        let session = config.session_config();
        assert_eq!(session.history_window, 4);
        assert_eq!(session.system_prompt, "Be terse.");
        assert_eq!(session.options.temperature, 0.2);

        let tools = config.tools.as_ref().unwrap();
        assert_eq!(tools.connect_timeout(), Duration::from_secs(3));
        let server = tools.server_config();
        assert_eq!(server.name, "tools");
        assert_eq!(server.command, "node");
        assert_eq!(server.args, vec!["build/index.js".to_string()]);
        assert_eq!(server.env["API_URL"], "http://localhost:3000");
    }

    #[test]
    fn tools_require_command() {
        assert!(matches!(
            Config::parse("[tools]\nargs = []"),
            Err(ConfigError::Parse(_))
        ));
        let config = Config::parse("[tools]\ncommand = \" \"").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyToolCommand)));
    }

    #[test]
    fn temperature_out_of_range() {
        for value in ["-0.1", "2.5"] {
            let config = Config::parse(&format!("[model]\ntemperature = {value}")).unwrap();
            assert!(matches!(config.validate(), Err(ConfigError::Temperature(_))));
        }
        let config = Config::parse("[model]\ntemperature = 2.0").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn zero_window_rejected() {
        let config = Config::parse("[chat]\nhistory_window = 0").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::HistoryWindow)));
    }

    #[test]
    fn explicit_path_must_exist() {
        let missing = Path::new("/nonexistent/parley-test.toml");
        assert!(matches!(
            Config::discover(Some(missing)),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("parley-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[model]\nname = \"qwen3\"\n").unwrap();
        let config = Config::discover(Some(path.as_path())).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.model.name, "qwen3");
    }
}
