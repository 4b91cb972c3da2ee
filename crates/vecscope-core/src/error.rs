use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed caller input (query text, neighbour count).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The embedding provider could not produce a vector for this request.
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Corpus is empty: no chunks were loaded")]
    EmptyCorpus,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Dimensionality reduction failed: {0}")]
    Reduction(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Request-scoped errors are reported to the caller and never affect the loaded corpus.
    pub fn is_request_scoped(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::EmbeddingUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
