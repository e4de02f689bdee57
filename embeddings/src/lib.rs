//! # Codeseek Embeddings
//!
//! Turns chunk text and search queries into fixed-dimension vectors.
//!
//! [`EmbeddingProvider`] is the seam the indexer depends on. The default
//! backend is [`JinaEmbeddingProvider`], which talks to the Jina AI HTTP API
//! with batching, exponential backoff and usage accounting. With the
//! `local-embeddings` feature, `LocalEmbeddingProvider` runs a fastembed model
//! in-process instead. The local backend is library-only: the indexer config
//! and the CLI always select Jina, so callers that want it install it with
//! `VectorManager::initialize_embeddings`.
//!
//! ## Example
//!
//! ```no_run
//! use codeseek_embeddings::{EmbeddingConfig, EmbeddingProvider, EmbeddingTask, JinaEmbeddingProvider};
//!
//! # async fn run() -> Result<(), codeseek_embeddings::EmbeddingError> {
//! let config = EmbeddingConfig::default().with_api_key("jina_...");
//! let provider = JinaEmbeddingProvider::new(config)?;
//! let texts = vec!["fn hello() { println!(\"Hello\"); }".to_string()];
//! let output = provider.embed_batched(&texts, EmbeddingTask::Passage).await?;
//! println!("Generated {} embeddings", output.embeddings.len());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod jina;
#[cfg(feature = "local-embeddings")]
mod local;
mod provider;

pub use config::EmbeddingConfig;
pub use error::EmbeddingError;
pub use jina::JinaEmbeddingProvider;
#[cfg(feature = "local-embeddings")]
pub use local::{LocalEmbeddingConfig, LocalEmbeddingProvider, LocalModel};
pub use provider::{EmbeddingOutput, EmbeddingProvider, EmbeddingTask, EmbeddingUsage};

pub const JINA_EMBEDDINGS_URL: &str = "https://api.jina.ai/v1/embeddings";

pub const DEFAULT_EMBEDDING_MODEL: &str = "jina-embeddings-v3";

/// Output dimension requested from jina-embeddings-v3
pub const DEFAULT_EMBEDDING_DIM: usize = 1024;
