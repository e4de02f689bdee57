//! # Codeseek Vector Store
//!
//! A durable, searchable map from embeddings to [`CodeChunk`]s.
//!
//! [`VectorIndex`] keeps L2-normalized vectors in one flat buffer so inner
//! product equals cosine similarity, pairs entry `i` with chunk `i`, and
//! persists itself as three artifacts that are loaded all together or not at
//! all.
//!
//! ## Example
//!
//! ```no_run
//! use codeseek_vector_store::VectorIndex;
//!
//! let index = VectorIndex::open(".vector_cache", 1024);
//! for hit in index.search(&vec![0.1; 1024], 5)? {
//!     println!("{:.3} {}", hit.score, hit.chunk.id);
//! }
//! # Ok::<(), codeseek_vector_store::VectorStoreError>(())
//! ```
//!
//! [`CodeChunk`]: codeseek_code_chunker::CodeChunk

mod error;
mod index;
mod persist;
mod stats;

pub use error::VectorStoreError;
pub use index::{SearchHit, VectorIndex};
pub use persist::{CHUNKS_FILE, ChunkRecord, INDEX_FORMAT_VERSION, METADATA_FILE, VECTOR_FILE};
pub use stats::IndexStats;

pub type Result<T> = std::result::Result<T, VectorStoreError>;
