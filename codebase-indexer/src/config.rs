use crate::error::{ManagerError, Result};
use codeseek_code_chunker::{FileAccessPolicy, SplitterConfig};
use codeseek_embeddings::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Looked up in the workspace root when no explicit path is given
pub const CONFIG_FILE_NAME: &str = ".codeseek.toml";

pub const ENV_API_KEY: &str = "JINA_API_KEY";
pub const ENV_EMBEDDING_MODEL: &str = "CODESEEK_EMBEDDING_MODEL";
pub const ENV_INDEX_DIR: &str = "CODESEEK_INDEX_DIR";
pub const ENV_MAX_FILE_SIZE: &str = "CODESEEK_MAX_FILE_SIZE";
pub const ENV_BATCH_SIZE: &str = "CODESEEK_BATCH_SIZE";

/// Everything the manager needs, one TOML section per component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeseekConfig {
    #[serde(default)]
    pub splitter: SplitterConfig,

    #[serde(default)]
    pub access: FileAccessPolicy,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Relative paths resolve against the workspace root
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(".vector_cache")
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
        }
    }
}

impl CodeseekConfig {
    /// Load `explicit`, else `<workspace_root>/.codeseek.toml` when present,
    /// else defaults; then apply environment overrides and validate.
    pub fn load(workspace_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = workspace_root.join(CONFIG_FILE_NAME);
                candidate.is_file().then_some(candidate)
            }
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate().map_err(ManagerError::Config)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| ManagerError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply overrides from `lookup`, normally the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = var(ENV_API_KEY) {
            self.embedding.api_key = Some(api_key);
        }
        if let Some(model) = var(ENV_EMBEDDING_MODEL) {
            self.embedding.model = model;
        }
        if let Some(dir) = var(ENV_INDEX_DIR) {
            self.index.dir = PathBuf::from(dir);
        }
        if let Some(size) = var(ENV_MAX_FILE_SIZE) {
            self.access.max_file_size = parse_env(ENV_MAX_FILE_SIZE, &size)?;
        }
        if let Some(batch_size) = var(ENV_BATCH_SIZE) {
            self.embedding.batch_size = parse_env(ENV_BATCH_SIZE, &batch_size)?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.splitter.validate()?;
        self.embedding.validate()?;
        if self.access.max_file_size == 0 {
            return Err("access.max_file_size must be > 0".to_string());
        }
        if self.index.dir.as_os_str().is_empty() {
            return Err("index.dir must not be empty".to_string());
        }
        Ok(())
    }

    pub fn index_dir(&self, workspace_root: &Path) -> PathBuf {
        if self.index.dir.is_absolute() {
            self.index.dir.clone()
        } else {
            workspace_root.join(&self.index.dir)
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ManagerError::Config(format!("{key} has invalid value `{value}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CodeseekConfig::default();
        assert_eq!(config.splitter.max_tokens, 7000);
        assert_eq!(config.embedding.model, "jina-embeddings-v3");
        assert_eq!(config.index.dir, PathBuf::from(".vector_cache"));
        assert!(config.validate().is_ok());
        assert_eq!(
            config.index_dir(Path::new("/work")),
            PathBuf::from("/work/.vector_cache")
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CodeseekConfig = toml::from_str(
            r#"
[splitter]
max_tokens = 512

[access]
allow_hidden_files = false

[embedding]
batch_size = 16

[index]
dir = "/var/cache/codeseek"
"#,
        )
        .expect("parse");

        assert_eq!(config.splitter.max_tokens, 512);
        assert_eq!(config.splitter.min_chunk_chars, 50);
        assert!(!config.access.allow_hidden_files);
        assert!(config.access.forbidden_paths.contains("node_modules"));
        assert_eq!(config.embedding.batch_size, 16);
        assert_eq!(config.embedding.dimension, 1024);
        assert_eq!(
            config.index_dir(Path::new("/work")),
            PathBuf::from("/var/cache/codeseek")
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_KEY, "jina_test"),
            (ENV_EMBEDDING_MODEL, "jina-embeddings-v2-base-code"),
            (ENV_INDEX_DIR, "cache"),
            (ENV_MAX_FILE_SIZE, "2048"),
            (ENV_BATCH_SIZE, "10"),
        ]);
        let mut config = CodeseekConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .expect("overrides");

        assert_eq!(config.embedding.api_key.as_deref(), Some("jina_test"));
        assert_eq!(config.embedding.model, "jina-embeddings-v2-base-code");
        assert_eq!(config.index.dir, PathBuf::from("cache"));
        assert_eq!(config.access.max_file_size, 2048);
        assert_eq!(config.embedding.batch_size, 10);
    }

    #[test]
    fn test_blank_env_is_ignored_and_bad_numbers_fail() {
        let mut config = CodeseekConfig::default();
        config
            .apply_env(|key| (key == ENV_API_KEY).then(|| "  ".to_string()))
            .expect("blank ignored");
        assert_eq!(config.embedding.api_key, None);

        let result = config.apply_env(|key| (key == ENV_BATCH_SIZE).then(|| "many".to_string()));
        assert!(matches!(result, Err(ManagerError::Config(_))));
    }

    #[test]
    fn test_load_from_workspace_file() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[splitter]\nmin_chunk_chars = 10\n",
        )
        .expect("write");

        let config = CodeseekConfig::from_file(&dir.path().join(CONFIG_FILE_NAME)).expect("load");
        assert_eq!(config.splitter.min_chunk_chars, 10);

        std::fs::write(dir.path().join("broken.toml"), "[splitter\n").expect("write");
        let result = CodeseekConfig::from_file(&dir.path().join("broken.toml"));
        assert!(matches!(result, Err(ManagerError::Config(_))));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = CodeseekConfig::default();
        config.splitter.min_chunk_chars = 5000;
        assert!(config.validate().is_err());

        let mut config = CodeseekConfig::default();
        config.embedding.batch_size = 0;
        assert!(config.validate().is_err());
    }
}
