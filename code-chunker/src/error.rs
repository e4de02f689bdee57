use thiserror::Error;

/// Errors that can occur during code splitting
///
/// Per-file problems never surface here; they are logged and the file is
/// skipped. These variants cover setup and parser failures.
#[derive(Debug, Error)]
pub enum ChunkerError {
    /// The structural parser could not produce a tree
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The structural parser has no grammar for this language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A file pattern is not a valid glob
    #[error("Invalid file pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
