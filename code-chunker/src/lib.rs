//! # Codeseek Code Chunker
//!
//! Splits source files into retrievable chunks for semantic search.
//!
//! ## Architecture
//!
//! ```text
//! Source file
//!     │
//!     ├──> Access policy (forbidden paths, size, extension)
//!     │
//!     ├──> Language detection (extension, then shebang)
//!     │
//!     ├──> Structural parse (tree-sitter) ──> CodeBlock[]
//!     │    ├─> class_header + method chunks per class
//!     │    ├─> function / block chunks
//!     │    └─> context windows when the file is sparse
//!     │
//!     ├──> Fallback: fixed line windows (text_chunk)
//!     │
//!     └──> Token budget: oversized chunks split into contiguous parts
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use codeseek_code_chunker::{CodeSplitter, FileAccessPolicy, SplitterConfig};
//!
//! # fn main() -> Result<(), codeseek_code_chunker::ChunkerError> {
//! let splitter = CodeSplitter::new(".", SplitterConfig::default(), FileAccessPolicy::default())?;
//! let chunks = splitter.split_file("src/main.py", None);
//! println!("Generated {} chunks", chunks.len());
//! # Ok(())
//! # }
//! ```

mod access;
mod block;
mod config;
mod error;
mod language;
mod parser;
mod splitter;
mod strategy;

pub use access::{AccessDenied, FileAccessPolicy};
pub use block::{BlockSpan, ClassBlock, CodeBlock, FunctionBlock, GenericBlock, MethodBlock};
pub use config::SplitterConfig;
pub use error::ChunkerError;
pub use language::Language;
pub use parser::{StructuralParser, TreeSitterParser, UnavailableParser, default_parser};
pub use splitter::CodeSplitter;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Hex characters of the content hash kept in a chunk id.
const ID_HASH_LEN: usize = 16;

/// A retrievable unit of source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// `{file_path}:{start_line}:{content hash}`, unique within an index.
    pub id: String,

    /// Raw text of the chunk
    pub content: String,

    /// Path relative to the workspace root, `/`-separated
    pub file_path: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    pub chunk_type: ChunkType,

    /// Element name; split continuations carry a `_partN` suffix
    pub name: String,

    /// Enclosing class (or receiver/impl type) for methods
    pub parent_name: Option<String>,

    /// Language tag, `unknown` when undetected
    pub language: String,

    pub metadata: ChunkMetadata,
}

impl CodeChunk {
    /// Deterministic id for a chunk of `content` starting at `start_line`.
    pub fn compute_id(file_path: &str, start_line: usize, content: &str) -> String {
        let digest = Sha256::digest(content.as_bytes());
        let mut hash = String::with_capacity(ID_HASH_LEN);
        for byte in digest.iter().take(ID_HASH_LEN / 2) {
            hash.push_str(&format!("{byte:02x}"));
        }
        format!("{file_path}:{start_line}:{hash}")
    }

    /// Number of lines covered.
    pub fn line_count(&self) -> usize {
        if self.end_line >= self.start_line {
            self.end_line - self.start_line + 1
        } else {
            0
        }
    }
}

/// Kind of code element a chunk holds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChunkType {
    /// Class signature plus its docstring
    ClassHeader,
    Method,
    Function,
    /// A whole class that has no methods of its own
    Class,
    /// Structs, enums, interfaces, type aliases
    Block,
    /// Coarse line window added to sparse files
    Context,
    /// Line window from the unparsed fallback
    TextChunk,
}

impl ChunkType {
    /// Short label used in the synthetic description line before embedding.
    pub fn label(self) -> &'static str {
        match self {
            ChunkType::ClassHeader => "Class header",
            ChunkType::Method => "Method",
            ChunkType::Function => "Function",
            ChunkType::Class => "Class",
            ChunkType::Block => "Block",
            ChunkType::Context => "Context",
            ChunkType::TextChunk => "Text chunk",
        }
    }
}

/// Structural details attached to a chunk.
///
/// Every field is always serialized; the binary chunk store relies on a
/// fixed field layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub parameters: Vec<String>,

    #[serde(default)]
    pub decorators: Vec<String>,

    #[serde(default)]
    pub base_classes: Vec<String>,

    #[serde(default)]
    pub is_async: bool,

    #[serde(default)]
    pub is_static: bool,

    /// Present when a logical block was split to fit the token budget
    #[serde(default)]
    pub split: Option<SplitInfo>,
}

/// Position of a part within a split logical block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInfo {
    /// 1-based
    pub part_number: usize,
    pub total_parts: usize,
}
