use thiserror::Error;

/// Errors from completion requests.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum CompletionError {
    /// The model server could not be reached or did not answer in time.
    #[error("model server unreachable: {0}")]
    Connectivity(String),

    /// The model server answered, but not with a usable completion.
    #[error("model server error: {0}")]
    Upstream(String),
}

impl CompletionError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() {
            Self::Connectivity(e.to_string())
        } else {
            Self::Upstream(e.to_string())
        }
    }
}
