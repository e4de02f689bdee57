//! Token counting shared by the splitter and the embedding layer.
//!
//! A BPE vocabulary (`cl100k_base`) is used when it can be loaded. When it
//! cannot, counts fall back to a fixed ratio of four characters per token.
//! Both paths are deterministic for the same input.

use std::fmt;
use std::sync::Arc;

use log::warn;
use thiserror::Error;
use tiktoken_rs::CoreBPE;

/// Characters per token assumed by the heuristic counter.
pub const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("failed to load BPE vocabulary: {0}")]
    Load(String),
}

/// Counts tokens either exactly (BPE) or approximately (character ratio).
#[derive(Clone)]
pub enum Tokenizer {
    Bpe(Arc<CoreBPE>),
    Heuristic,
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tokenizer::Bpe(_) => f.write_str("Tokenizer::Bpe(cl100k_base)"),
            Tokenizer::Heuristic => f.write_str("Tokenizer::Heuristic"),
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::try_default()
    }
}

impl Tokenizer {
    /// Load the `cl100k_base` vocabulary.
    pub fn bpe() -> Result<Self, TokenizerError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| TokenizerError::Load(e.to_string()))?;
        Ok(Tokenizer::Bpe(Arc::new(bpe)))
    }

    /// BPE when available, otherwise the heuristic counter.
    pub fn try_default() -> Self {
        match Self::bpe() {
            Ok(tokenizer) => tokenizer,
            Err(err) => {
                warn!("{err}; falling back to {CHARS_PER_TOKEN} chars/token estimate");
                Tokenizer::Heuristic
            }
        }
    }

    pub fn heuristic() -> Self {
        Tokenizer::Heuristic
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Tokenizer::Bpe(_))
    }

    /// Number of tokens in `text`.
    ///
    /// Never exceeds the UTF-8 byte length of `text` on either path.
    pub fn count(&self, text: &str) -> usize {
        match self {
            Tokenizer::Bpe(bpe) => bpe.encode_ordinary(text).len(),
            Tokenizer::Heuristic => text.chars().count().div_ceil(CHARS_PER_TOKEN),
        }
    }
}
