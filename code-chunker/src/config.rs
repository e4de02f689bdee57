use serde::{Deserialize, Serialize};

/// Rough characters-per-line figure used to size line windows from a
/// character budget.
const CHARS_PER_WINDOW_LINE: usize = 50;

/// Configuration for code splitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Hard per-chunk token limit (kept below the embedding model's context)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Character budget that sizes context and fallback line windows
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Logical blocks shorter than this once trimmed are dropped
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// Below this many structural chunks a file also gets context windows
    #[serde(default = "default_min_structural_chunks")]
    pub min_structural_chunks: usize,

    /// Use the tree-sitter backend; when false every file is line-windowed
    #[serde(default = "default_true")]
    pub enable_parsing: bool,
}

fn default_max_tokens() -> usize {
    7000
}

fn default_max_chunk_chars() -> usize {
    2000
}

fn default_min_chunk_chars() -> usize {
    50
}

fn default_min_structural_chunks() -> usize {
    3
}

fn default_true() -> bool {
    true
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            max_chunk_chars: default_max_chunk_chars(),
            min_chunk_chars: default_min_chunk_chars(),
            min_structural_chunks: default_min_structural_chunks(),
            enable_parsing: true,
        }
    }
}

impl SplitterConfig {
    /// Lines per context / fallback window.
    pub fn window_lines(&self) -> usize {
        (self.max_chunk_chars / CHARS_PER_WINDOW_LINE).max(1)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tokens < 16 {
            return Err("max_tokens must be at least 16".into());
        }

        if self.max_chunk_chars == 0 {
            return Err("max_chunk_chars must be greater than 0".into());
        }

        if self.min_chunk_chars >= self.max_chunk_chars {
            return Err("min_chunk_chars must be less than max_chunk_chars".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = SplitterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_lines(), 40);
    }

    #[test]
    fn test_window_lines_never_zero() {
        let config = SplitterConfig {
            max_chunk_chars: 10,
            min_chunk_chars: 1,
            ..Default::default()
        };
        assert_eq!(config.window_lines(), 1);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = SplitterConfig::default();
        config.min_chunk_chars = 5000;
        assert!(config.validate().is_err());

        let mut config = SplitterConfig::default();
        config.max_tokens = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SplitterConfig = serde_json::from_str(r#"{"max_tokens": 512}"#).expect("parse");
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.min_chunk_chars, 50);
        assert!(config.enable_parsing);
    }
}
