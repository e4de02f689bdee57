use crate::error::ManagerError;
use codeseek_code_chunker::{ChunkMetadata, ChunkType};
use codeseek_embeddings::EmbeddingUsage;
use codeseek_vector_store::IndexStats;
use serde::Serialize;

/// Outcome of a build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    pub message: String,
    pub stats: IndexStats,
    /// Absent when an existing index was reused
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_usage: Option<EmbeddingUsage>,
    pub rebuild_required: bool,
}

impl BuildReport {
    /// Whether embedding work was skipped because an index already existed.
    pub fn reused_existing(&self) -> bool {
        self.embedding_usage.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_type: ChunkType,
    pub name: String,
    pub parent_name: Option<String>,
    pub language: String,
    pub similarity_score: f32,
    pub content_preview: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchResult>,
    pub filter_type: Option<ChunkType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStatus {
    pub index_exists: bool,
    pub index_loaded: bool,
    pub embedding_provider_ready: bool,
    pub stats: IndexStats,
}

/// `{success: true, ...payload}` or `{success: false, error}`.
#[derive(Debug, Serialize)]
pub struct ToolResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub payload: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ToolResponse<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(err: &ManagerError) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(err.to_string()),
        }
    }
}

impl<T> From<Result<T, ManagerError>> for ToolResponse<T> {
    fn from(result: Result<T, ManagerError>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(err) => Self::failure(&err),
        }
    }
}
