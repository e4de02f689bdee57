/*!
# Codeseek Codebase Indexer

Builds and queries a semantic search index over one workspace.

## Features

- **Contextualized embeddings**: each chunk is embedded with a description line naming what it is and where it lives
- **Idempotent builds**: an existing index is reused unless a rebuild is forced
- **Atomic builds**: a failed embedding run leaves the previous index in place
- **Type filtering**: restrict search results to methods, functions, classes and so on
- **Structured responses**: every operation serializes to `{success, ...}` JSON

## Example

```rust,no_run
use codeseek_codebase_indexer::{CodeseekConfig, VectorManager};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let root = Path::new("./my-project");
    let config = CodeseekConfig::load(root, None)?;
    let mut manager = VectorManager::new(root, &config)?;

    let report = manager.build(None, false).await?;
    println!("Indexed {} chunks", report.stats.total_chunks);

    let results = manager.search("parse configuration file", 5, None).await?;
    for result in results.results {
        println!("{:.3} {}:{}", result.similarity_score, result.file_path, result.start_line);
    }
    Ok(())
}
```
*/

mod config;
mod error;
mod manager;
mod response;
mod text;

pub use config::{
    CONFIG_FILE_NAME, CodeseekConfig, ENV_API_KEY, ENV_BATCH_SIZE, ENV_EMBEDDING_MODEL,
    ENV_INDEX_DIR, ENV_MAX_FILE_SIZE, IndexConfig,
};
pub use error::{ManagerError, Result};
pub use manager::{IndexPhase, IndexProgress, ProgressCallback, VectorManager};
pub use response::{BuildReport, IndexStatus, SearchResult, SearchResults, ToolResponse};
pub use text::{PREVIEW_CHARS, chunk_to_text, content_preview};

pub use codeseek_vector_store::IndexStats;
