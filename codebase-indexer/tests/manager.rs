mod common;

use codeseek_code_chunker::ChunkType;
use codeseek_codebase_indexer::{
    BuildReport, IndexPhase, ManagerError, SearchResults, ToolResponse, VectorManager,
};
use common::{config, create_workspace, manager_with_fake};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[tokio::test]
async fn test_build_and_search_require_provider() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let mut manager = VectorManager::new(dir.path(), &config()).expect("manager");

    assert!(!manager.has_provider());
    let build = manager.build(None, false).await;
    assert!(matches!(build, Err(ManagerError::ProviderNotInitialized)));
    let search = manager.search("reserve", 5, None).await;
    assert!(matches!(search, Err(ManagerError::ProviderNotInitialized)));

    let status = manager.index_status();
    assert!(!status.embedding_provider_ready);
    assert!(!status.index_exists);
    assert!(!status.index_loaded);
}

#[tokio::test]
async fn test_empty_workspace_has_no_chunks() {
    let dir = TempDir::new().expect("tempdir");
    let (mut manager, fake) = manager_with_fake(dir.path());

    let result = manager.build(None, false).await;
    assert!(matches!(result, Err(ManagerError::NoChunks)));
    assert_eq!(fake.calls(), 0);
    assert!(!manager.index_status().index_exists);
}

#[test_log::test(tokio::test)]
async fn test_build_then_search() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, fake) = manager_with_fake(dir.path());

    let report = manager.build(None, false).await.expect("build");
    assert_eq!(report.message, "Vector index built successfully");
    assert!(!report.rebuild_required);
    assert_eq!(report.stats.total_files, 2);
    assert_eq!(report.stats.chunk_types.get("method"), Some(&3));
    assert_eq!(report.stats.chunk_types.get("function"), Some(&3));
    assert_eq!(report.stats.languages.get("python"), Some(&report.stats.total_chunks));
    let usage = report.embedding_usage.expect("usage");
    assert!(usage.total_tokens > 0);
    assert_eq!(fake.calls(), 1);

    let results = manager
        .search("reserve", 3, None)
        .await
        .expect("search");
    assert_eq!(results.query, "reserve");
    assert_eq!(results.total_results, results.results.len());
    assert!(results.results.len() <= 3);
    let top = &results.results[0];
    assert_eq!(top.name, "reserve");
    assert_eq!(top.chunk_type, ChunkType::Method);
    assert_eq!(top.parent_name.as_deref(), Some("InventoryService"));
    assert_eq!(top.file_path, "inventory.py");
    assert!(
        results
            .results
            .windows(2)
            .all(|pair| pair[0].similarity_score >= pair[1].similarity_score)
    );
    assert!(
        results
            .results
            .iter()
            .all(|r| (-1.0..=1.0).contains(&r.similarity_score))
    );
    // one query embedding on top of the build
    assert_eq!(fake.calls(), 2);
}

#[tokio::test]
async fn test_second_build_reuses_index() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, fake) = manager_with_fake(dir.path());

    let first = manager.build(None, false).await.expect("first build");
    let second = manager.build(None, false).await.expect("second build");

    assert_eq!(fake.calls(), 1);
    assert_eq!(second.message, "Vector index already exists");
    assert!(second.reused_existing());
    assert_eq!(second.stats, first.stats);
}

#[tokio::test]
async fn test_force_rebuild_embeds_again() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, fake) = manager_with_fake(dir.path());

    let first = manager.build(None, false).await.expect("build");
    let forced = manager.build(None, true).await.expect("rebuild");

    assert_eq!(fake.calls(), 2);
    assert_eq!(forced.message, "Vector index built successfully");
    assert_eq!(forced.stats, first.stats);
    // the saved index never ends up inside its own sweep
    assert_eq!(forced.stats.total_files, 2);
}

#[tokio::test]
async fn test_search_preconditions() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, _fake) = manager_with_fake(dir.path());

    let result = manager.search("reserve", 5, None).await;
    assert!(matches!(result, Err(ManagerError::IndexEmpty)));

    manager.build(None, false).await.expect("build");
    let result = manager.search("   ", 5, None).await;
    assert!(matches!(result, Err(ManagerError::InvalidQuery(_))));
    let result = manager.search("reserve", 0, None).await;
    assert!(matches!(result, Err(ManagerError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_search_filters_by_type_and_bounds_k() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, _fake) = manager_with_fake(dir.path());
    manager.build(None, false).await.expect("build");

    let methods = manager
        .search("quantity sku", 10, Some(ChunkType::Method))
        .await
        .expect("search");
    assert_eq!(methods.filter_type, Some(ChunkType::Method));
    assert_eq!(methods.total_results, 3);
    assert!(methods.results.iter().all(|r| r.chunk_type == ChunkType::Method));

    let functions = manager
        .search("parse", 10, Some(ChunkType::Function))
        .await
        .expect("search");
    let mut names: Vec<&str> = functions.results.iter().map(|r| r.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["chunked", "format_price", "parse_sku"]);

    let bounded = manager.search("sku", 2, None).await.expect("search");
    assert_eq!(bounded.total_results, 2);
}

#[tokio::test]
async fn test_failed_embedding_keeps_existing_index() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, fake) = manager_with_fake(dir.path());
    let built = manager.build(None, false).await.expect("build");

    fake.set_failing(true);
    let result = manager.build(None, true).await;
    match result {
        Err(err @ ManagerError::Embedding(_)) => {
            assert!(err.to_string().starts_with("Failed to generate embeddings"));
        }
        other => panic!("expected embedding failure, got {other:?}"),
    }

    let status = manager.index_status();
    assert!(status.index_exists);
    assert!(status.index_loaded);
    assert_eq!(status.stats, built.stats);
}

#[tokio::test]
async fn test_failed_first_build_persists_nothing() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, fake) = manager_with_fake(dir.path());
    fake.set_failing(true);

    let result = manager.build(None, false).await;
    assert!(matches!(result, Err(ManagerError::Embedding(_))));
    assert!(!manager.index_status().index_exists);
    assert!(manager.stats().is_empty());
}

#[tokio::test]
async fn test_index_survives_restart() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, _fake) = manager_with_fake(dir.path());
    manager.build(None, false).await.expect("build");
    let before = manager.stats();
    drop(manager);

    let (mut reopened, fake) = manager_with_fake(dir.path());
    let status = reopened.index_status();
    assert!(status.index_exists);
    assert!(status.index_loaded);
    assert_eq!(status.stats, before);

    let report = reopened.build(None, false).await.expect("build");
    assert!(report.reused_existing());
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn test_clear_returns_to_absent() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, _fake) = manager_with_fake(dir.path());
    manager.build(None, false).await.expect("build");

    manager.clear().expect("clear");
    let status = manager.index_status();
    assert!(!status.index_exists);
    assert!(!status.index_loaded);
    assert_eq!(status.stats.total_chunks, 0);

    let result = manager.search("reserve", 5, None).await;
    assert!(matches!(result, Err(ManagerError::IndexEmpty)));
}

#[tokio::test]
async fn test_chunk_content_returns_full_text() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, _fake) = manager_with_fake(dir.path());
    manager.build(None, false).await.expect("build");

    let results = manager.search("reserve", 1, None).await.expect("search");
    let hit = &results.results[0];
    let content = manager.chunk_content(&hit.chunk_id).expect("stored content");
    assert!(content.trim_start().starts_with("def reserve"));
    assert!(content.contains("cannot reserve more than available"));
    assert!(manager.chunk_content("missing.py:1:0000").is_none());
}

#[tokio::test]
async fn test_patterns_limit_the_build() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, _fake) = manager_with_fake(dir.path());

    let patterns = vec!["helpers.py".to_string()];
    let report = manager.build(Some(&patterns), false).await.expect("build");
    assert_eq!(report.stats.total_files, 1);
    assert_eq!(report.stats.chunk_types.get("method"), None);
}

#[tokio::test]
async fn test_progress_reports_phases() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (manager, _fake) = manager_with_fake(dir.path());

    let phases = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&phases);
    let mut manager = manager.with_progress(Arc::new(move |progress| {
        if let Ok(mut phases) = sink.lock() {
            phases.push(progress.phase);
        }
    }));
    manager.build(None, false).await.expect("build");

    let phases = phases.lock().expect("lock").clone();
    assert_eq!(phases.first(), Some(&IndexPhase::Splitting));
    assert_eq!(phases.last(), Some(&IndexPhase::Complete));
    assert!(phases.contains(&IndexPhase::Embedding));
    assert!(phases.contains(&IndexPhase::Storing));
}

#[tokio::test]
async fn test_tool_response_shapes() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, _fake) = manager_with_fake(dir.path());

    let failed: ToolResponse<SearchResults> = manager.search("reserve", 5, None).await.into();
    let value = serde_json::to_value(&failed).expect("serialize");
    assert_eq!(value["success"], serde_json::json!(false));
    assert_eq!(
        value["error"],
        serde_json::json!("Vector index is empty. Please build the index first.")
    );

    let built: ToolResponse<BuildReport> = manager.build(None, false).await.into();
    let value = serde_json::to_value(&built).expect("serialize");
    assert_eq!(value["success"], serde_json::json!(true));
    assert_eq!(value["stats"]["total_files"], serde_json::json!(2));
    assert!(value["embedding_usage"]["total_tokens"].as_u64().unwrap_or(0) > 0);

    let found: ToolResponse<SearchResults> = manager.search("reserve", 2, None).await.into();
    let value = serde_json::to_value(&found).expect("serialize");
    assert_eq!(value["total_results"], serde_json::json!(2));
    let first = &value["results"][0];
    for key in [
        "chunk_id",
        "file_path",
        "start_line",
        "end_line",
        "chunk_type",
        "name",
        "parent_name",
        "language",
        "similarity_score",
        "content_preview",
        "metadata",
    ] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
}

#[test_log::test(tokio::test)]
async fn test_failed_save_is_not_reported_as_existing_index() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, fake) = manager_with_fake(dir.path());
    // a regular file where the index directory should go
    let index_dir = manager.index_dir().to_path_buf();
    std::fs::write(&index_dir, "not a directory").expect("block index dir");

    let result = manager.build(None, false).await;
    assert!(matches!(result, Err(ManagerError::VectorStore(_))));
    let status = manager.index_status();
    assert!(!status.index_exists);
    assert!(!status.index_loaded);

    std::fs::remove_file(&index_dir).expect("unblock index dir");
    let report = manager.build(None, false).await.expect("build");
    assert_eq!(report.message, "Vector index built successfully");
    assert!(!report.reused_existing());
    assert_eq!(fake.calls(), 2);
    assert!(manager.index_status().index_exists);
}

#[tokio::test]
async fn test_failed_forced_save_keeps_saved_index() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, _fake) = manager_with_fake(dir.path());
    let built = manager.build(None, false).await.expect("build");

    let index_dir = manager.index_dir().to_path_buf();
    let moved = dir.path().join(".moved_index");
    std::fs::rename(&index_dir, &moved).expect("move index");
    std::fs::write(&index_dir, "not a directory").expect("block index dir");

    let result = manager.build(None, true).await;
    assert!(matches!(result, Err(ManagerError::VectorStore(_))));
    assert!(!manager.index_status().index_loaded);

    std::fs::remove_file(&index_dir).expect("unblock index dir");
    std::fs::rename(&moved, &index_dir).expect("restore index");
    let report = manager.build(None, false).await.expect("reuse");
    assert!(report.reused_existing());
    assert_eq!(report.stats, built.stats);
}

#[tokio::test]
async fn test_debug_summarizes_index() {
    let dir = TempDir::new().expect("tempdir");
    create_workspace(dir.path());
    let (mut manager, _fake) = manager_with_fake(dir.path());
    manager.build(None, false).await.expect("build");

    let rendered = format!("{manager:?}");
    assert!(rendered.contains("indexed_chunks"));
    assert!(!rendered.contains("cannot reserve more than available"));
}
