use crate::error::VectorStoreError;
use crate::persist::{
    ChunkRecord, INDEX_FORMAT_VERSION, IndexFiles, VectorFile, chunk_set_digest, write_atomic,
};
use crate::stats::IndexStats;
use codeseek_code_chunker::CodeChunk;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: CodeChunk,
    /// Cosine similarity in `[-1, 1]`
    pub score: f32,
    /// Insertion offset of the entry
    pub offset: usize,
}

/// Exact inner-product index over L2-normalized vectors, paired one to one
/// with the chunks they embed.
///
/// Offsets are stable: entry `i` is `vectors[i * dimension..(i + 1) * dimension]`
/// and `chunks[i]`. Appends never move existing entries.
#[derive(Debug)]
pub struct VectorIndex {
    index_dir: PathBuf,
    dimension: usize,
    vectors: Vec<f32>,
    chunks: Vec<CodeChunk>,
    offsets: HashMap<String, usize>,
}

impl VectorIndex {
    /// An empty in-memory index; nothing is read from disk.
    pub fn new(index_dir: impl Into<PathBuf>, dimension: usize) -> Self {
        Self {
            index_dir: index_dir.into(),
            dimension,
            vectors: Vec::new(),
            chunks: Vec::new(),
            offsets: HashMap::new(),
        }
    }

    /// An index initialised from disk when a complete saved index is present.
    pub fn open(index_dir: impl Into<PathBuf>, dimension: usize) -> Self {
        let mut index = Self::new(index_dir, dimension);
        index.load();
        index
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn vector_count(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    pub fn chunks(&self) -> &[CodeChunk] {
        &self.chunks
    }

    pub fn get_chunk(&self, chunk_id: &str) -> Option<&CodeChunk> {
        self.offsets.get(chunk_id).map(|&offset| &self.chunks[offset])
    }

    /// Replace all in-memory state with `vectors` paired to `chunks`.
    ///
    /// Returns the number of entries stored; a chunk whose id is already
    /// present earlier in the input is skipped.
    pub fn create(
        &mut self,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<CodeChunk>,
    ) -> Result<usize, VectorStoreError> {
        self.validate(&vectors, &chunks)?;
        self.reset();
        let added = self.insert(vectors, chunks);
        info!("Created vector index with {added} vectors");
        Ok(added)
    }

    /// Add entries after the existing ones; ids already in the index are
    /// skipped. On an empty index this is [`create`](Self::create).
    pub fn append(
        &mut self,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<CodeChunk>,
    ) -> Result<usize, VectorStoreError> {
        self.validate(&vectors, &chunks)?;
        let added = self.insert(vectors, chunks);
        info!(
            "Appended {added} vectors, index now holds {}",
            self.chunks.len()
        );
        Ok(added)
    }

    fn validate(&self, vectors: &[Vec<f32>], chunks: &[CodeChunk]) -> Result<(), VectorStoreError> {
        if vectors.len() != chunks.len() {
            return Err(VectorStoreError::LengthMismatch {
                vectors: vectors.len(),
                chunks: chunks.len(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, vectors: Vec<Vec<f32>>, chunks: Vec<CodeChunk>) -> usize {
        let mut added = 0;
        for (mut vector, chunk) in vectors.into_iter().zip(chunks) {
            if self.offsets.contains_key(&chunk.id) {
                debug!("Skipping duplicate chunk {}", chunk.id);
                continue;
            }
            normalize(&mut vector);
            self.offsets.insert(chunk.id.clone(), self.chunks.len());
            self.vectors.extend_from_slice(&vector);
            self.chunks.push(chunk);
            added += 1;
        }
        added
    }

    /// Up to `k` entries most similar to `query`, best first. Equal scores
    /// keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, VectorStoreError> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .map(|row| dot(row, &query).clamp(-1.0, 1.0))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(offset, score)| SearchHit {
                chunk: self.chunks[offset].clone(),
                score,
                offset,
            })
            .collect())
    }

    /// Whether all three artifacts exist on disk.
    pub fn exists(&self) -> bool {
        IndexFiles::new(&self.index_dir).all_exist()
    }

    /// Persist all three artifacts.
    pub fn save(&self) -> Result<(), VectorStoreError> {
        std::fs::create_dir_all(&self.index_dir)?;
        let files = IndexFiles::new(&self.index_dir);

        let vector_file = VectorFile {
            version: INDEX_FORMAT_VERSION,
            dimension: self.dimension,
            count: self.chunks.len(),
            chunk_digest: chunk_set_digest(self.chunks.iter().map(|chunk| chunk.id.as_str())),
            data: self.vectors.clone(),
        };
        let records: Vec<ChunkRecord> = self.chunks.iter().map(ChunkRecord::from).collect();

        write_atomic(&files.chunks, &bincode::serialize(&self.chunks)?)?;
        write_atomic(&files.metadata, &serde_json::to_vec_pretty(&records)?)?;
        write_atomic(&files.vectors, &bincode::serialize(&vector_file)?)?;

        info!(
            "Saved vector index with {} chunks to {}",
            self.chunks.len(),
            self.index_dir.display()
        );
        Ok(())
    }

    /// Replace in-memory state with the saved index.
    ///
    /// A missing artifact, or any disagreement between them, leaves the index
    /// empty and returns `false`.
    pub fn load(&mut self) -> bool {
        self.reset();
        let files = IndexFiles::new(&self.index_dir);
        if !files.all_exist() {
            debug!("No saved index at {}", self.index_dir.display());
            return false;
        }

        match self.read_saved(&files) {
            Ok((vectors, chunks)) => {
                self.offsets = chunks
                    .iter()
                    .enumerate()
                    .map(|(offset, chunk)| (chunk.id.clone(), offset))
                    .collect();
                self.vectors = vectors;
                self.chunks = chunks;
                info!("Loaded vector index with {} chunks", self.chunks.len());
                true
            }
            Err(err) => {
                warn!(
                    "Ignoring unreadable index at {}: {err}",
                    self.index_dir.display()
                );
                false
            }
        }
    }

    fn read_saved(
        &self,
        files: &IndexFiles,
    ) -> Result<(Vec<f32>, Vec<CodeChunk>), VectorStoreError> {
        let vector_file: VectorFile = bincode::deserialize(&std::fs::read(&files.vectors)?)?;
        if vector_file.version != INDEX_FORMAT_VERSION {
            return Err(VectorStoreError::Corrupt(format!(
                "format version {} is not {INDEX_FORMAT_VERSION}",
                vector_file.version
            )));
        }
        if vector_file.dimension != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector_file.dimension,
            });
        }
        if vector_file.data.len() != vector_file.count * self.dimension {
            return Err(VectorStoreError::Corrupt(format!(
                "{} floats for {} vectors",
                vector_file.data.len(),
                vector_file.count
            )));
        }

        let chunks: Vec<CodeChunk> = bincode::deserialize(&std::fs::read(&files.chunks)?)?;
        let records: Vec<ChunkRecord> =
            serde_json::from_slice(&std::fs::read(&files.metadata)?)?;
        if chunks.len() != vector_file.count || records.len() != vector_file.count {
            return Err(VectorStoreError::Corrupt(format!(
                "{} vectors, {} chunks, {} metadata records",
                vector_file.count,
                chunks.len(),
                records.len()
            )));
        }
        if chunks.iter().zip(&records).any(|(chunk, record)| chunk.id != record.id) {
            return Err(VectorStoreError::Corrupt(
                "chunk data and metadata are out of order".to_string(),
            ));
        }
        let digest = chunk_set_digest(chunks.iter().map(|chunk| chunk.id.as_str()));
        if digest != vector_file.chunk_digest {
            return Err(VectorStoreError::Corrupt(
                "vectors were saved for a different chunk set".to_string(),
            ));
        }

        Ok((vector_file.data, chunks))
    }

    /// Delete the saved artifacts and empty the index.
    pub fn clear(&mut self) -> Result<(), VectorStoreError> {
        for path in IndexFiles::new(&self.index_dir).all() {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        self.reset();
        info!("Cleared vector index at {}", self.index_dir.display());
        Ok(())
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats::collect(
            &self.chunks,
            self.dimension,
            self.index_dir.display().to_string(),
        )
    }

    fn reset(&mut self) {
        self.vectors.clear();
        self.chunks.clear();
        self.offsets.clear();
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scale to unit length; the zero vector stays zero.
fn normalize(vector: &mut [f32]) {
    let norm = dot(vector, vector).sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
