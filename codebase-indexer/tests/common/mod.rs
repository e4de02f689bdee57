#![allow(dead_code)]

use async_trait::async_trait;
use codeseek_codebase_indexer::{CodeseekConfig, VectorManager};
use codeseek_embeddings::{EmbeddingError, EmbeddingOutput, EmbeddingProvider, EmbeddingTask, EmbeddingUsage};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const DIMENSION: usize = 1024;

pub const INVENTORY: &str = r#"class InventoryService:
    """Tracks stock levels for every product in the warehouse."""

    def __init__(self, store):
        self.store = store
        self.levels = {}

    def reserve(self, sku, quantity):
        """Reserve units so they cannot be sold twice."""
        available = self.levels.get(sku, 0)
        if available < quantity:
            raise ValueError("cannot reserve more than available")
        self.levels[sku] = available - quantity

    def restock(self, sku, quantity):
        self.levels[sku] = self.levels.get(sku, 0) + quantity
        self.store.save(sku, self.levels[sku])
"#;

pub const HELPERS: &str = r#"def format_price(amount, currency):
    symbol = {"usd": "$", "eur": "E"}.get(currency, "")
    return f"{symbol}{amount:.2f}"


def parse_sku(raw):
    prefix, number = raw.split("-", 1)
    return prefix.upper(), int(number)


def chunked(items, size):
    for start in range(0, len(items), size):
        yield items[start:start + size]
"#;

/// Deterministic bag-of-words embeddings: every word adds one to a hashed
/// bucket, so texts sharing words score higher.
#[derive(Clone, Default)]
pub struct FakeProvider {
    pub calls: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

impl FakeProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        word.to_lowercase().hash(&mut hasher);
        vector[(hasher.finish() % DIMENSION as u64) as usize] += 1.0;
    }
    if vector.iter().all(|v| *v == 0.0) {
        vector[0] = 1.0;
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for FakeProvider {
    fn model(&self) -> &str {
        "fake-bag-of-words"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn batch_size(&self) -> usize {
        50
    }

    async fn embed(
        &self,
        texts: &[String],
        _task: EmbeddingTask,
    ) -> Result<EmbeddingOutput, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Api {
                status: 500,
                body: "upstream unavailable".to_string(),
            });
        }
        let tokens = texts.iter().map(|t| t.split_whitespace().count() as u64).sum();
        Ok(EmbeddingOutput {
            embeddings: texts.iter().map(|t| bag_of_words(t)).collect(),
            model: self.model().to_string(),
            usage: EmbeddingUsage {
                total_tokens: tokens,
                prompt_tokens: tokens,
            },
        })
    }
}

pub fn create_workspace(dir: &Path) {
    fs::write(dir.join("inventory.py"), INVENTORY).expect("write inventory");
    fs::write(dir.join("helpers.py"), HELPERS).expect("write helpers");
}

pub fn config() -> CodeseekConfig {
    let mut config = CodeseekConfig::default();
    config.embedding.api_key = None;
    config.embedding.dimension = DIMENSION;
    config
}

/// Manager over `dir` with a fresh fake provider installed.
pub fn manager_with_fake(dir: &Path) -> (VectorManager, FakeProvider) {
    let fake = FakeProvider::default();
    let mut manager = VectorManager::new(dir, &config()).expect("manager");
    manager.initialize_embeddings(Box::new(fake.clone()));
    (manager, fake)
}
