use thiserror::Error;

/// Errors that can occur during vector index operations
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Vectors and chunks passed together must pair up one to one
    #[error("Got {vectors} vectors for {chunks} chunks")]
    LengthMismatch { vectors: usize, chunks: usize },

    #[error("Expected vectors of dimension {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persisted artifacts disagree with each other or with this index
    #[error("Corrupt index: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Binary encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

impl From<tempfile::PersistError> for VectorStoreError {
    fn from(err: tempfile::PersistError) -> Self {
        VectorStoreError::Io(err.error)
    }
}
