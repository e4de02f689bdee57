use std::path::Path;

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Bash,
    Unknown,
}

impl Language {
    /// Detect language from the path, falling back to a shebang in `content`.
    pub fn detect(path: &Path, content: &str) -> Self {
        match Self::from_path(path) {
            Language::Unknown => Self::from_shebang(content),
            language => language,
        }
    }

    /// Detect language from file extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Detect language from file extension string
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" | "pyi" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "sh" | "bash" => Language::Bash,
            _ => Language::Unknown,
        }
    }

    /// Detect language from a `#!` interpreter line.
    pub fn from_shebang(content: &str) -> Self {
        let Some(first_line) = content.lines().next() else {
            return Language::Unknown;
        };
        let first_line = first_line.trim();
        if !first_line.starts_with("#!") {
            return Language::Unknown;
        }

        if first_line.contains("python") {
            Language::Python
        } else if first_line.contains("node") || first_line.contains("javascript") {
            Language::JavaScript
        } else if first_line.contains("ruby") {
            Language::Ruby
        } else if first_line.contains("php") {
            Language::Php
        } else if first_line.ends_with("bash")
            || first_line.ends_with("/sh")
            || first_line.ends_with(" sh")
        {
            Language::Bash
        } else {
            Language::Unknown
        }
    }

    /// Get the language name as string
    pub fn name(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Bash => "bash",
            Language::Unknown => "unknown",
        }
    }

    /// Check if language has a bundled tree-sitter grammar
    pub fn has_tree_sitter_support(self) -> bool {
        matches!(
            self,
            Language::Python
                | Language::JavaScript
                | Language::TypeScript
                | Language::Java
                | Language::Rust
                | Language::Go
        )
    }
}
