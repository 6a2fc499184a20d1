//! Ollama backend (`/api/generate`).

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{CompletionError, CompletionOptions, LlmBackend, strip_reasoning};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "deepseek-r1";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// One object of a `/api/generate` response (the whole body when not streaming).
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Builder for creating an Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaBackendBuilder {
    base_url: String,
    model: String,
    stream: bool,
    request_timeout: Duration,
}

impl OllamaBackendBuilder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            stream: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Request a token stream (default) or a single response object.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Upper bound for one completion, body included.
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn build(self) -> OllamaBackend {
        OllamaBackend {
            client: reqwest::Client::new(),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            model: self.model,
            stream: self.stream,
            request_timeout: self.request_timeout,
        }
    }
}

/// Completion client for an Ollama-compatible server.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    stream: bool,
    request_timeout: Duration,
}

impl OllamaBackend {
    pub fn builder(base_url: impl Into<String>, model: impl Into<String>) -> OllamaBackendBuilder {
        OllamaBackendBuilder::new(base_url, model)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models installed on the server.
    ///
    /// Doubles as the reachability check run before a session starts.
    pub async fn installed_models(&self) -> Result<Vec<String>, CompletionError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CompletionError::Upstream(format!(
                "model listing failed: {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn drain(&self, response: reqwest::Response) -> Result<String, CompletionError> {
        let mut body = response.bytes_stream();
        let mut acc = StreamAccumulator::default();
        while let Some(chunk) = body.next().await {
            acc.feed(&chunk?)?;
        }
        acc.finish()
    }
}

/// Whether `model` is among `installed`, allowing an implicit `:latest`-style tag.
pub fn is_installed(installed: &[String], model: &str) -> bool {
    installed.iter().any(|name| {
        name == model
            || name
                .strip_prefix(model)
                .is_some_and(|tag| tag.starts_with(':'))
    })
}

impl std::fmt::Display for OllamaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ollama({} @ {})", self.model, self.base_url)
    }
}

impl LlmBackend for OllamaBackend {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: self.stream,
            options: GenerateOptions {
                temperature: options.temperature,
            },
        };

        tracing::debug!(model = %self.model, stream = self.stream, prompt_len = prompt.len(), "requesting completion");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Upstream(format!("{status}: {body}")));
        }

        let raw = if self.stream {
            self.drain(response).await?
        } else {
            let chunk: GenerateChunk = response.json().await?;
            if let Some(error) = chunk.error {
                return Err(CompletionError::Upstream(error));
            }
            chunk.response
        };

        tracing::debug!(model = %self.model, raw_len = raw.len(), "completion received");
        Ok(strip_reasoning(&raw))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Reassembles newline-delimited JSON chunks into the full response text.
#[derive(Debug, Default)]
struct StreamAccumulator {
    pending: Vec<u8>,
    text: String,
    done: bool,
}

impl StreamAccumulator {
    fn feed(&mut self, bytes: &[u8]) -> Result<(), CompletionError> {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume(&line)?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<String, CompletionError> {
        let rest = std::mem::take(&mut self.pending);
        self.consume(&rest)?;
        if !self.done {
            tracing::warn!("completion stream ended without a done marker");
        }
        Ok(self.text)
    }

    fn consume(&mut self, line: &[u8]) -> Result<(), CompletionError> {
        let line = line.trim_ascii();
        if line.is_empty() || self.done {
            return Ok(());
        }

        let chunk: GenerateChunk = serde_json::from_slice(line)
            .map_err(|e| CompletionError::Upstream(format!("invalid stream chunk: {e}")))?;
        if let Some(error) = chunk.error {
            return Err(CompletionError::Upstream(error));
        }

        self.text.push_str(&chunk.response);
        self.done = chunk.done;
        Ok(())
    }
}
