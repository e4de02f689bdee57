use thiserror::Error;

/// Errors that can occur during embedding operations
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// No credential was supplied for a remote provider
    #[error("Jina API key is required")]
    MissingApiKey,

    #[error("No texts provided")]
    EmptyInput,

    /// A single `embed` call received more texts than one batch may hold
    #[error("Batch of {size} texts exceeds the configured batch size of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    /// The provider answered with a non-retryable status, or retries ran out
    #[error("Embedding API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Rate limited by embedding API after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response did not line up with the request
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("Invalid embedding configuration: {0}")]
    InvalidConfig(String),

    /// Failed to initialize a local embedding model
    #[error("Failed to initialize embedding model: {0}")]
    ModelInitialization(String),

    #[error("Failed to generate embeddings: {0}")]
    EmbeddingGeneration(String),
}
