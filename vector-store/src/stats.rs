use codeseek_code_chunker::CodeChunk;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregate counts over the chunks held by an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub total_files: usize,
    pub avg_chunks_per_file: f64,
    pub chunk_types: BTreeMap<String, usize>,
    pub languages: BTreeMap<String, usize>,
    pub dimension: usize,
    pub index_dir: String,
}

impl IndexStats {
    pub(crate) fn collect(chunks: &[CodeChunk], dimension: usize, index_dir: String) -> Self {
        let mut chunk_types = BTreeMap::new();
        let mut languages = BTreeMap::new();
        let mut files = BTreeSet::new();

        for chunk in chunks {
            *chunk_types
                .entry(chunk.chunk_type.to_string())
                .or_insert(0) += 1;
            *languages.entry(chunk.language.clone()).or_insert(0) += 1;
            files.insert(chunk.file_path.as_str());
        }

        let avg_chunks_per_file = if files.is_empty() {
            0.0
        } else {
            chunks.len() as f64 / files.len() as f64
        };

        Self {
            total_chunks: chunks.len(),
            total_files: files.len(),
            avg_chunks_per_file,
            chunk_types,
            languages,
            dimension,
            index_dir,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_chunks == 0
    }
}
