use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiftError {
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("timeout after {0}s")]
    Timeout(u64),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("embedding error: {0}")]
    Embed(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("embedding dimension mismatch: got {got}, expected {expected}")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
