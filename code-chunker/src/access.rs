use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path};

const VERSION_CONTROL_DIRS: &[&str] = &[".git", ".svn", ".hg"];

/// Workspace file access predicate consulted before any file is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAccessPolicy {
    /// Files larger than this many bytes are skipped
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Lower-case extensions without the dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: BTreeSet<String>,

    /// Path components that exclude everything beneath them
    #[serde(default = "default_forbidden_paths")]
    pub forbidden_paths: BTreeSet<String>,

    #[serde(default = "default_true")]
    pub allow_hidden_files: bool,

    #[serde(default)]
    pub allow_version_control: bool,
}

/// Why a path was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    ForbiddenPath(String),
    VersionControl(String),
    Hidden(String),
    Extension(String),
    TooLarge { size: u64, limit: u64 },
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessDenied::ForbiddenPath(part) => write!(f, "forbidden path component `{part}`"),
            AccessDenied::VersionControl(part) => write!(f, "version control directory `{part}`"),
            AccessDenied::Hidden(part) => write!(f, "hidden path component `{part}`"),
            AccessDenied::Extension(ext) => write!(f, "extension `.{ext}` not allowed"),
            AccessDenied::TooLarge { size, limit } => {
                write!(f, "file is {size} bytes, limit is {limit}")
            }
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_extensions() -> BTreeSet<String> {
    [
        // programming languages
        "py", "pyw", "pyi", "java", "js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts", "c",
        "cpp", "cc", "cxx", "h", "hpp", "hxx", "cs", "php", "rb", "go", "rs", "swift", "kt",
        "scala", "dart", "lua", "pl", "sh", "bash", "zsh", "ps1", "bat", "cmd", "asm", "s",
        // web
        "html", "css", "scss", "sass", "less", "vue", "svelte", "astro",
        // data and config
        "json", "yaml", "yml", "toml", "xml", "cfg", "ini", "conf", "properties", "env", "sql",
        "graphql", "proto",
        // documentation
        "md", "txt", "rst", "adoc", "tex",
        // build and project files
        "dockerfile", "dockerignore", "gitignore", "gitattributes", "editorconfig", "eslintrc",
        "prettierrc", "babelrc",
        // tabular
        "csv", "tsv",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_forbidden_paths() -> BTreeSet<String> {
    ["node_modules", ".venv", "venv", "__pycache__", ".pytest_cache"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_true() -> bool {
    true
}

impl Default for FileAccessPolicy {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
            forbidden_paths: default_forbidden_paths(),
            allow_hidden_files: true,
            allow_version_control: false,
        }
    }
}

impl FileAccessPolicy {
    /// Full check of a workspace-relative file path (size excluded).
    pub fn check_path(&self, relative: &Path) -> Result<(), AccessDenied> {
        self.check_components(relative)?;
        self.check_extension(relative)
    }

    /// Component-level checks only; used to prune directories while walking.
    pub fn check_components(&self, relative: &Path) -> Result<(), AccessDenied> {
        for component in relative.components() {
            let Component::Normal(part) = component else {
                continue;
            };
            let part = part.to_string_lossy();

            if self.forbidden_paths.contains(part.as_ref()) {
                return Err(AccessDenied::ForbiddenPath(part.into_owned()));
            }
            if !self.allow_version_control && VERSION_CONTROL_DIRS.contains(&part.as_ref()) {
                return Err(AccessDenied::VersionControl(part.into_owned()));
            }
            if !self.allow_hidden_files && part.starts_with('.') {
                return Err(AccessDenied::Hidden(part.into_owned()));
            }
        }
        Ok(())
    }

    pub fn check_size(&self, size: u64) -> Result<(), AccessDenied> {
        if size > self.max_file_size {
            return Err(AccessDenied::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    fn check_extension(&self, relative: &Path) -> Result<(), AccessDenied> {
        let Some(ext) = relative.extension() else {
            return Ok(());
        };
        let ext = ext.to_string_lossy().to_lowercase();
        if self.allowed_extensions.contains(&ext) {
            Ok(())
        } else {
            Err(AccessDenied::Extension(ext))
        }
    }
}
