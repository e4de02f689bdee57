use crate::error::EmbeddingError;
use crate::provider::{EmbeddingOutput, EmbeddingProvider, EmbeddingTask, EmbeddingUsage};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Configuration for the local embedding provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEmbeddingConfig {
    pub model: LocalModel,

    /// Target embedding dimension (for Matryoshka truncation)
    pub dimension: usize,

    pub batch_size: usize,

    /// Show download progress when downloading models
    pub show_download_progress: bool,
}

impl Default for LocalEmbeddingConfig {
    fn default() -> Self {
        Self {
            model: LocalModel::NomicEmbedTextV15,
            dimension: LocalModel::NomicEmbedTextV15.native_dimension(),
            batch_size: 32,
            show_download_progress: false,
        }
    }
}

/// Supported local models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalModel {
    /// Nomic-embed-text-v1.5, asymmetric via task prefixes
    NomicEmbedTextV15,
    /// All-MiniLM-L6-v2 (lightweight, faster)
    AllMiniLmL6V2,
}

impl LocalModel {
    fn to_fastembed_model(self) -> EmbeddingModel {
        match self {
            LocalModel::NomicEmbedTextV15 => EmbeddingModel::NomicEmbedTextV15,
            LocalModel::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LocalModel::NomicEmbedTextV15 => "nomic-embed-text-v1.5",
            LocalModel::AllMiniLmL6V2 => "all-MiniLM-L6-v2",
        }
    }

    pub fn native_dimension(self) -> usize {
        match self {
            LocalModel::NomicEmbedTextV15 => 768,
            LocalModel::AllMiniLmL6V2 => 384,
        }
    }

    /// Nomic distinguishes documents from queries by a text prefix.
    fn prefix(self, task: EmbeddingTask) -> &'static str {
        match (self, task) {
            (LocalModel::NomicEmbedTextV15, EmbeddingTask::Passage) => "search_document: ",
            (LocalModel::NomicEmbedTextV15, EmbeddingTask::Query) => "search_query: ",
            (LocalModel::AllMiniLmL6V2, _) => "",
        }
    }
}

/// Embeddings computed in-process through ONNX Runtime.
pub struct LocalEmbeddingProvider {
    model: TextEmbedding,
    config: LocalEmbeddingConfig,
}

impl LocalEmbeddingProvider {
    pub fn new(config: LocalEmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.dimension == 0 || config.dimension > config.model.native_dimension() {
            return Err(EmbeddingError::InvalidConfig(format!(
                "dimension must be between 1 and {}",
                config.model.native_dimension()
            )));
        }

        info!(
            "Initializing local embedding model {}, dimension {}",
            config.model.name(),
            config.dimension
        );
        let init_options = InitOptions::new(config.model.to_fastembed_model())
            .with_show_download_progress(config.show_download_progress);
        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbeddingError::ModelInitialization(e.to_string()))?;

        Ok(Self { model, config })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    fn model(&self) -> &str {
        self.config.model.name()
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    async fn embed(
        &self,
        texts: &[String],
        task: EmbeddingTask,
    ) -> Result<EmbeddingOutput, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let prefix = self.config.model.prefix(task);
        let inputs: Vec<String> = texts.iter().map(|t| format!("{prefix}{t}")).collect();
        debug!("Generating {} local embeddings", inputs.len());

        let mut embeddings = self
            .model
            .embed(inputs, Some(self.config.batch_size))
            .map_err(|e| EmbeddingError::EmbeddingGeneration(e.to_string()))?;
        for embedding in &mut embeddings {
            // Matryoshka truncation
            embedding.truncate(self.config.dimension);
        }

        Ok(EmbeddingOutput {
            embeddings,
            model: self.config.model.name().to_string(),
            usage: EmbeddingUsage::default(),
        })
    }
}
