//! On-disk layout of a saved index.
//!
//! Three artifacts live side by side in the index directory:
//!
//! - `vector_index.bin`: bincode [`VectorFile`], the flat row-major vectors
//! - `chunks_metadata.json`: pretty JSON array of [`ChunkRecord`], for humans
//!   and external tools
//! - `chunks_data.bin`: bincode `Vec<CodeChunk>`, including content
//!
//! Each file is written to a temp file in the same directory and renamed into
//! place. The vector file records a digest of the ordered chunk ids so a
//! vector file left over from an earlier save is never paired with newer
//! chunks.

use crate::error::VectorStoreError;
use codeseek_code_chunker::{ChunkMetadata, ChunkType, CodeChunk};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const VECTOR_FILE: &str = "vector_index.bin";
pub const METADATA_FILE: &str = "chunks_metadata.json";
pub const CHUNKS_FILE: &str = "chunks_data.bin";

/// Bumped whenever the binary layout changes.
pub const INDEX_FORMAT_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct VectorFile {
    pub version: u32,
    pub dimension: usize,
    pub count: usize,
    /// [`chunk_set_digest`] of the chunks these rows embed
    pub chunk_digest: String,
    pub data: Vec<f32>,
}

/// Hex SHA-256 over the chunk ids, in offset order.
pub(crate) fn chunk_set_digest<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// A chunk without its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_type: ChunkType,
    pub name: String,
    pub parent_name: Option<String>,
    pub language: String,
    pub metadata: ChunkMetadata,
}

impl From<&CodeChunk> for ChunkRecord {
    fn from(chunk: &CodeChunk) -> Self {
        Self {
            id: chunk.id.clone(),
            file_path: chunk.file_path.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            chunk_type: chunk.chunk_type,
            name: chunk.name.clone(),
            parent_name: chunk.parent_name.clone(),
            language: chunk.language.clone(),
            metadata: chunk.metadata.clone(),
        }
    }
}

pub(crate) struct IndexFiles {
    pub vectors: PathBuf,
    pub metadata: PathBuf,
    pub chunks: PathBuf,
}

impl IndexFiles {
    pub fn new(index_dir: &Path) -> Self {
        Self {
            vectors: index_dir.join(VECTOR_FILE),
            metadata: index_dir.join(METADATA_FILE),
            chunks: index_dir.join(CHUNKS_FILE),
        }
    }

    pub fn all(&self) -> [&Path; 3] {
        [&self.vectors, &self.metadata, &self.chunks]
    }

    pub fn all_exist(&self) -> bool {
        self.all().iter().all(|path| path.is_file())
    }
}

/// Write `bytes` to `path` through a sibling temp file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), VectorStoreError> {
    let dir = path
        .parent()
        .ok_or_else(|| VectorStoreError::Corrupt(format!("{} has no parent", path.display())))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
