use thiserror::Error;

use crate::backend::CompletionError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

pub type Result<T> = std::result::Result<T, Error>;
