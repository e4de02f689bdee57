use crate::config::CodeseekConfig;
use crate::error::{ManagerError, Result};
use crate::response::{BuildReport, IndexStatus, SearchResult, SearchResults};
use crate::text::{chunk_to_text, content_preview};
use codeseek_code_chunker::{ChunkType, CodeSplitter};
use codeseek_embeddings::{EmbeddingConfig, EmbeddingProvider, EmbeddingTask, JinaEmbeddingProvider};
use codeseek_vector_store::{IndexStats, VectorIndex};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Progress callback for build operations
pub type ProgressCallback = Arc<dyn Fn(IndexProgress) + Send + Sync>;

/// Build progress information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexProgress {
    pub phase: IndexPhase,
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPhase {
    Splitting,
    Embedding,
    Storing,
    Complete,
}

/// Owns the index lifecycle for one workspace: split, embed, store, search.
///
/// Build and search require an embedding provider; without one the manager
/// can still report status, read stored chunks and clear the index.
pub struct VectorManager {
    workspace_root: PathBuf,
    splitter: CodeSplitter,
    index: VectorIndex,
    provider: Option<Box<dyn EmbeddingProvider>>,
    progress: Option<ProgressCallback>,
}

impl VectorManager {
    /// Create a manager for `workspace_root`, loading any saved index.
    ///
    /// When the config carries an API key the Jina provider is initialised
    /// right away.
    pub fn new(workspace_root: impl Into<PathBuf>, config: &CodeseekConfig) -> Result<Self> {
        let workspace_root = workspace_root.into();
        config.validate().map_err(ManagerError::Config)?;

        let index_dir = config.index_dir(&workspace_root);
        let splitter = CodeSplitter::new(
            workspace_root.clone(),
            config.splitter.clone(),
            config.access.clone(),
        )?
        .exclude_dir(&index_dir);
        let index = VectorIndex::open(index_dir, config.embedding.dimension);

        let mut manager = Self {
            workspace_root,
            splitter,
            index,
            provider: None,
            progress: None,
        };

        if config.embedding.api_key.is_some() {
            manager.initialize_jina(config.embedding.clone())?;
        } else {
            info!("No embedding API key configured; build and search are unavailable");
        }
        Ok(manager)
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Install the embedding provider used by build and search.
    ///
    /// A provider with a different output dimension reopens the index at that
    /// dimension; a saved index of another dimension then reads as absent.
    pub fn initialize_embeddings(&mut self, provider: Box<dyn EmbeddingProvider>) {
        if provider.dimension() != self.index.dimension() {
            warn!(
                "Embedding dimension {} differs from index dimension {}; reopening index",
                provider.dimension(),
                self.index.dimension()
            );
            self.index = VectorIndex::open(self.index.index_dir().to_path_buf(), provider.dimension());
        }
        info!("Embedding provider ready: {}", provider.model());
        self.provider = Some(provider);
    }

    pub fn initialize_jina(&mut self, config: EmbeddingConfig) -> Result<()> {
        let provider = JinaEmbeddingProvider::new(config)?;
        self.initialize_embeddings(Box::new(provider));
        Ok(())
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn index_dir(&self) -> &Path {
        self.index.index_dir()
    }

    /// Build the index from the workspace.
    ///
    /// Without `force_rebuild` an existing non-empty saved index is reused and
    /// no embedding work happens. Embedding is all or nothing: on failure the
    /// current index, in memory and on disk, is left untouched. The new index
    /// replaces the current one only once it has been saved.
    pub async fn build(
        &mut self,
        file_patterns: Option<&[String]>,
        force_rebuild: bool,
    ) -> Result<BuildReport> {
        let provider = self
            .provider
            .as_deref()
            .ok_or(ManagerError::ProviderNotInitialized)?;

        if !force_rebuild {
            if self.index.is_empty() && self.index.exists() {
                self.index.load();
            }
            if self.index.exists() && !self.index.is_empty() {
                info!(
                    "Reusing existing vector index with {} chunks",
                    self.index.len()
                );
                return Ok(BuildReport {
                    message: "Vector index already exists".to_string(),
                    stats: self.index.stats(),
                    embedding_usage: None,
                    rebuild_required: false,
                });
            }
        }

        info!(
            "Building vector index for {}",
            self.workspace_root.display()
        );
        self.report(IndexPhase::Splitting, 0, 0);
        let chunks = self.splitter.split_workspace(file_patterns)?;
        if chunks.is_empty() {
            return Err(ManagerError::NoChunks);
        }
        info!("Generated {} chunks", chunks.len());

        let texts: Vec<String> = chunks.iter().map(chunk_to_text).collect();
        self.report(IndexPhase::Embedding, 0, texts.len());
        let output = provider
            .embed_batched(&texts, EmbeddingTask::Passage)
            .await?;
        self.report(IndexPhase::Embedding, texts.len(), texts.len());
        debug!(
            "Embedding used {} tokens",
            output.usage.total_tokens
        );

        self.report(IndexPhase::Storing, 0, chunks.len());
        let mut fresh = VectorIndex::new(self.index.index_dir(), self.index.dimension());
        let stored = fresh.create(output.embeddings, chunks)?;
        if let Err(err) = fresh.save() {
            warn!("Failed to save vector index: {err}");
            // whatever survived on disk is the index now
            self.index.load();
            return Err(err.into());
        }
        self.index = fresh;
        self.report(IndexPhase::Complete, stored, stored);

        let stats = self.index.stats();
        info!(
            "Vector index built: {} chunks from {} files",
            stats.total_chunks, stats.total_files
        );
        Ok(BuildReport {
            message: "Vector index built successfully".to_string(),
            stats,
            embedding_usage: Some(output.usage),
            rebuild_required: false,
        })
    }

    /// Top `k` chunks for `query`, optionally restricted to one chunk type.
    ///
    /// `2k` candidates are fetched so filtering by type still leaves up to
    /// `k` results.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter_type: Option<ChunkType>,
    ) -> Result<SearchResults> {
        let provider = self
            .provider
            .as_deref()
            .ok_or(ManagerError::ProviderNotInitialized)?;
        if self.index.is_empty() {
            return Err(ManagerError::IndexEmpty);
        }
        if query.trim().is_empty() {
            return Err(ManagerError::InvalidQuery("query must not be empty".to_string()));
        }
        if k == 0 {
            return Err(ManagerError::InvalidQuery("k must be at least 1".to_string()));
        }

        let query_vector = provider.embed_query(query).await?;
        let hits = self.index.search(&query_vector, k.saturating_mul(2))?;

        let results: Vec<SearchResult> = hits
            .into_iter()
            .filter(|hit| filter_type.is_none_or(|wanted| hit.chunk.chunk_type == wanted))
            .take(k)
            .map(|hit| SearchResult {
                content_preview: content_preview(&hit.chunk.content),
                chunk_id: hit.chunk.id,
                file_path: hit.chunk.file_path,
                start_line: hit.chunk.start_line,
                end_line: hit.chunk.end_line,
                chunk_type: hit.chunk.chunk_type,
                name: hit.chunk.name,
                parent_name: hit.chunk.parent_name,
                language: hit.chunk.language,
                similarity_score: hit.score,
                metadata: hit.chunk.metadata,
            })
            .collect();

        debug!("Search for {query:?} returned {} results", results.len());
        Ok(SearchResults {
            query: query.to_string(),
            total_results: results.len(),
            results,
            filter_type,
        })
    }

    /// Full stored content of a chunk.
    pub fn chunk_content(&self, chunk_id: &str) -> Option<&str> {
        self.index
            .get_chunk(chunk_id)
            .map(|chunk| chunk.content.as_str())
    }

    pub fn index_status(&self) -> IndexStatus {
        IndexStatus {
            index_exists: self.index.exists(),
            index_loaded: !self.index.is_empty(),
            embedding_provider_ready: self.provider.is_some(),
            stats: self.index.stats(),
        }
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    /// Delete the saved index and empty the in-memory one.
    pub fn clear(&mut self) -> Result<()> {
        self.index.clear()?;
        Ok(())
    }

    fn report(&self, phase: IndexPhase, current: usize, total: usize) {
        if let Some(callback) = &self.progress {
            callback(IndexProgress {
                phase,
                current,
                total,
            });
        }
    }
}

impl std::fmt::Debug for VectorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorManager")
            .field("workspace_root", &self.workspace_root)
            .field("index_dir", &self.index.index_dir())
            .field("indexed_chunks", &self.index.len())
            .field("dimension", &self.index.dimension())
            .field(
                "provider",
                &self.provider.as_ref().map(|provider| provider.model().to_string()),
            )
            .finish_non_exhaustive()
    }
}
