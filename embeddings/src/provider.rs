use crate::error::EmbeddingError;
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// Which side of an asymmetric retrieval pair a text is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmbeddingTask {
    /// Content stored in the index
    Passage,
    /// A search query
    Query,
}

impl EmbeddingTask {
    /// Task name on the Jina wire
    pub fn jina_task(self) -> &'static str {
        match self {
            EmbeddingTask::Passage => "retrieval.passage",
            EmbeddingTask::Query => "retrieval.query",
        }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub prompt_tokens: u64,
}

impl AddAssign for EmbeddingUsage {
    fn add_assign(&mut self, other: Self) {
        self.total_tokens += other.total_tokens;
        self.prompt_tokens += other.prompt_tokens;
    }
}

/// Vectors in input order, plus the model that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub model: String,
    pub usage: EmbeddingUsage,
}

/// Maps text to fixed-dimension vectors.
///
/// Implementations handle one batch in [`embed`](Self::embed); the provided
/// [`embed_batched`](Self::embed_batched) drives arbitrarily long inputs.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Maximum texts accepted by one `embed` call
    fn batch_size(&self) -> usize;

    /// Pause inserted between consecutive batches
    fn batch_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// Embed one batch. Vectors come back in input order.
    async fn embed(
        &self,
        texts: &[String],
        task: EmbeddingTask,
    ) -> Result<EmbeddingOutput, EmbeddingError>;

    /// Embed any number of texts, one batch at a time.
    ///
    /// All or nothing: the first failing batch aborts the call and no partial
    /// vectors are returned.
    async fn embed_batched(
        &self,
        texts: &[String],
        task: EmbeddingTask,
    ) -> Result<EmbeddingOutput, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let batch_size = self.batch_size().max(1);
        let total_batches = texts.len().div_ceil(batch_size);
        let delay = self.batch_delay();

        let mut output = EmbeddingOutput {
            embeddings: Vec::with_capacity(texts.len()),
            model: self.model().to_string(),
            usage: EmbeddingUsage::default(),
        };

        for (i, batch) in texts.chunks(batch_size).enumerate() {
            info!(
                "Processing batch {}/{total_batches} ({} texts)",
                i + 1,
                batch.len()
            );
            let result = self.embed(batch, task).await?;
            output.embeddings.extend(result.embeddings);
            output.usage += result.usage;

            if i + 1 < total_batches && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(output)
    }

    /// Embed a single search query.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbeddingError> {
        let output = self
            .embed(&[query.to_string()], EmbeddingTask::Query)
            .await?;
        output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding returned".to_string()))
    }
}
