//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is missing, unreadable or out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The model server did not answer the start-up health check.
    #[error("cannot reach model server at {url}: {source}")]
    ModelServer {
        url: String,
        #[source]
        source: runtime::Error,
    },

    /// An I/O error occurred on the terminal.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
