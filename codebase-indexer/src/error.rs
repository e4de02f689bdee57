use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Embedding provider not initialized. Please provide Jina API key.")]
    ProviderNotInitialized,

    #[error("No code chunks found. Check file patterns and workspace content.")]
    NoChunks,

    #[error("Vector index is empty. Please build the index first.")]
    IndexEmpty,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] codeseek_embeddings::EmbeddingError),

    #[error("Chunker error: {0}")]
    Chunker(#[from] codeseek_code_chunker::ChunkerError),

    #[error("Vector index error: {0}")]
    VectorStore(#[from] codeseek_vector_store::VectorStoreError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ManagerError>;
