use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::{DEFAULT_EMBEDDING_DIM, DEFAULT_EMBEDDING_MODEL, JINA_EMBEDDINGS_URL};

/// Configuration for a remote embedding provider
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Bearer credential; never serialized back out
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Requested output dimension; every returned vector must have it
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum texts per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Total attempts per request, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles on every further attempt
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Pause between consecutive batches
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    JINA_EMBEDDINGS_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_EMBEDDING_DIM
}

fn default_batch_size() -> usize {
    50
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_batch_delay_ms() -> u64 {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("batch_size", &self.batch_size)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("batch_delay_ms", &self.batch_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl EmbeddingConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.dimension == 0 {
            return Err("dimension must be > 0".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be > 0".to_string());
        }
        Ok(())
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.model, "jina-embeddings-v3");
        assert_eq!(config.dimension, 1024);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.batch_delay(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = EmbeddingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err("batch_size must be > 0".to_string()));

        let config = EmbeddingConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_is_not_serialized_or_printed() {
        let config = EmbeddingConfig::default().with_api_key("secret-key");
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(!json.contains("secret-key"));
        assert!(!format!("{config:?}").contains("secret-key"));
    }
}
