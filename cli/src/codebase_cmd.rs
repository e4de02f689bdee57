use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codeseek_code_chunker::ChunkType;
use codeseek_codebase_indexer::{
    BuildReport, CodeseekConfig, IndexPhase, IndexProgress, IndexStats, IndexStatus,
    SearchResults, ToolResponse, VectorManager,
};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::debug;

/// Semantic code search over a local workspace
#[derive(Debug, Parser)]
#[command(name = "codeseek", version)]
pub struct CodeseekCli {
    /// Workspace root (defaults to the current directory)
    #[arg(short, long, value_name = "PATH", global = true)]
    pub path: Option<PathBuf>,

    /// Configuration file (defaults to <workspace>/.codeseek.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CodebaseCommand,
}

#[derive(Debug, Subcommand)]
pub enum CodebaseCommand {
    /// Index the workspace for semantic search
    Index(IndexArgs),

    /// Search the indexed workspace
    Search(SearchArgs),

    /// Show index status and statistics
    Status(StatusArgs),

    /// Delete the saved index
    Clear(ClearArgs),
}

#[derive(Debug, Parser)]
pub struct IndexArgs {
    /// Only index files matching this glob (repeatable)
    #[arg(long = "pattern", value_name = "GLOB")]
    pub patterns: Vec<String>,

    /// Rebuild even when an index already exists
    #[arg(short, long)]
    pub force: bool,

    /// Jina API key (overrides JINA_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Embedding model name
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search query
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Number of results to return
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,

    /// Only return chunks of this type
    #[arg(long = "type", value_name = "CHUNK_TYPE", value_parser = parse_chunk_type)]
    pub chunk_type: Option<ChunkType>,

    /// Jina API key (overrides JINA_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Show full code chunks in results
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl CodeseekCli {
    pub async fn run(self) -> Result<ExitCode> {
        let root = match self.path {
            Some(path) => path,
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        let config = CodeseekConfig::load(&root, self.config.as_deref())
            .context("Failed to load configuration")?;
        debug!("Using workspace {}", root.display());

        match self.command {
            CodebaseCommand::Index(args) => run_index(root, config, args).await,
            CodebaseCommand::Search(args) => run_search(root, config, args).await,
            CodebaseCommand::Status(args) => run_status(root, config, args),
            CodebaseCommand::Clear(args) => run_clear(root, config, args),
        }
    }
}

fn parse_chunk_type(value: &str) -> Result<ChunkType, String> {
    ChunkType::from_str(value).map_err(|_| {
        let valid: Vec<String> = ChunkType::iter().map(|t| t.to_string()).collect();
        format!(
            "unknown chunk type `{value}`, expected one of: {}",
            valid.join(", ")
        )
    })
}

fn apply_overrides(config: &mut CodeseekConfig, api_key: Option<String>, model: Option<String>) {
    if let Some(api_key) = api_key {
        config.embedding.api_key = Some(api_key);
    }
    if let Some(model) = model {
        config.embedding.model = model;
    }
}

fn print_json<T: Serialize>(response: &ToolResponse<T>) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn progress_printer() -> Arc<dyn Fn(IndexProgress) + Send + Sync> {
    Arc::new(|progress: IndexProgress| {
        let label = match progress.phase {
            IndexPhase::Splitting => "Splitting workspace".to_string(),
            IndexPhase::Embedding if progress.current == 0 => {
                format!("Embedding {} chunks", progress.total)
            }
            IndexPhase::Embedding => return,
            IndexPhase::Storing => "Storing vectors".to_string(),
            IndexPhase::Complete => return,
        };
        eprintln!("{} {label}", "▶".bright_blue());
    })
}

async fn run_index(root: PathBuf, mut config: CodeseekConfig, args: IndexArgs) -> Result<ExitCode> {
    apply_overrides(&mut config, args.api_key, args.model);
    let patterns = (!args.patterns.is_empty()).then_some(args.patterns);

    let mut manager =
        VectorManager::new(&root, &config).context("Failed to initialize vector manager")?;
    if args.json {
        let result = manager.build(patterns.as_deref(), args.force).await;
        return print_json(&ToolResponse::from(result));
    }

    println!(
        "{} Indexing workspace at {}",
        "▶".bright_blue(),
        root.display()
    );
    println!(
        "{} Index will be stored at {}",
        "▶".bright_blue(),
        manager.index_dir().display()
    );
    let mut manager = manager.with_progress(progress_printer());
    let report = manager
        .build(patterns.as_deref(), args.force)
        .await
        .context("Failed to index workspace")?;
    print_build_report(&report);
    Ok(ExitCode::SUCCESS)
}

fn print_build_report(report: &BuildReport) {
    if report.reused_existing() {
        println!(
            "\n{} {} (use --force to rebuild)",
            "✓".bright_green(),
            report.message
        );
    } else {
        println!("\n{} {}", "✓".bright_green(), report.message);
    }
    print_stats(&report.stats);
    if let Some(usage) = &report.embedding_usage {
        println!("  Tokens embedded: {}", usage.total_tokens.bright_cyan());
    }
}

fn print_stats(stats: &IndexStats) {
    println!("  Chunks: {}", stats.total_chunks.bright_cyan());
    println!("  Files: {}", stats.total_files.bright_cyan());
    println!(
        "  Chunks per file: {}",
        format!("{:.1}", stats.avg_chunks_per_file).bright_cyan()
    );
    if !stats.chunk_types.is_empty() {
        let types: Vec<String> = stats
            .chunk_types
            .iter()
            .map(|(name, count)| format!("{name}={count}"))
            .collect();
        println!("  Types: {}", types.join(", "));
    }
    if !stats.languages.is_empty() {
        let languages: Vec<String> = stats
            .languages
            .iter()
            .map(|(name, count)| format!("{name}={count}"))
            .collect();
        println!("  Languages: {}", languages.join(", "));
    }
}

async fn run_search(root: PathBuf, mut config: CodeseekConfig, args: SearchArgs) -> Result<ExitCode> {
    apply_overrides(&mut config, args.api_key, None);
    let manager =
        VectorManager::new(&root, &config).context("Failed to initialize vector manager")?;
    let result = manager.search(&args.query, args.limit, args.chunk_type).await;

    if args.json {
        return print_json(&ToolResponse::from(result));
    }
    let results = result.context("Search failed")?;
    print_search_results(&manager, &results, args.verbose);
    Ok(ExitCode::SUCCESS)
}

fn print_search_results(manager: &VectorManager, results: &SearchResults, verbose: bool) {
    if results.results.is_empty() {
        println!("{} No results found", "✗".bright_red());
        return;
    }

    println!(
        "{} Found {} results\n",
        "✓".bright_green(),
        results.total_results.to_string().bright_cyan()
    );

    for (i, result) in results.results.iter().enumerate() {
        let name = match &result.parent_name {
            Some(parent) => format!("{parent}.{}", result.name),
            None => result.name.clone(),
        };
        println!(
            "{}. {}:{} {} {}",
            (i + 1).to_string().bright_yellow(),
            result.file_path.bright_cyan(),
            format!("{}-{}", result.start_line, result.end_line).bright_black(),
            result.chunk_type.as_ref().bright_magenta(),
            name
        );
        println!(
            "   {} {}",
            "Score:".bright_black(),
            format!("{:.3}", result.similarity_score).bright_green()
        );

        let content = if verbose {
            manager
                .chunk_content(&result.chunk_id)
                .unwrap_or(result.content_preview.as_str())
        } else {
            result.content_preview.as_str()
        };
        let limit = if verbose { usize::MAX } else { 10 };
        for line in content.lines().take(limit) {
            println!("   {}", line.dimmed());
        }
        if !verbose && content.lines().count() > limit {
            println!("   {}", "...".dimmed());
        }
        println!();
    }
}

fn run_status(root: PathBuf, config: CodeseekConfig, args: StatusArgs) -> Result<ExitCode> {
    let manager =
        VectorManager::new(&root, &config).context("Failed to initialize vector manager")?;
    let status = manager.index_status();

    if args.json {
        return print_json(&ToolResponse::ok(status));
    }
    print_status(&manager, &status);
    Ok(ExitCode::SUCCESS)
}

fn print_status(manager: &VectorManager, status: &IndexStatus) {
    let location = manager.index_dir().display().to_string();
    if !status.index_exists {
        println!("{} Index not found at {location}", "✗".bright_red());
        println!("  Run 'codeseek index' to create an index.");
    } else {
        println!("{} Index Status", "▶".bright_blue());
        println!("  Location: {}", location.bright_cyan());
        let state = if status.index_loaded {
            "Ready".bright_green().to_string()
        } else {
            "Unreadable (rebuild with --force)".bright_red().to_string()
        };
        println!("  Status: {state}");
        print_stats(&status.stats);
    }

    let provider = if status.embedding_provider_ready {
        "configured".bright_green().to_string()
    } else {
        "missing API key".bright_yellow().to_string()
    };
    println!("  Embedding provider: {provider}");
}

fn run_clear(root: PathBuf, config: CodeseekConfig, args: ClearArgs) -> Result<ExitCode> {
    let mut manager =
        VectorManager::new(&root, &config).context("Failed to initialize vector manager")?;
    let index_dir = manager.index_dir().display().to_string();

    if !manager.index_status().index_exists {
        println!("{} No index found at {index_dir}", "✗".bright_red());
        return Ok(ExitCode::SUCCESS);
    }

    if !args.yes {
        print!("Are you sure you want to clear the index at {index_dir}? [y/N] ");
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    manager.clear().context("Failed to clear index")?;
    println!("{} Index cleared", "✓".bright_green());
    Ok(ExitCode::SUCCESS)
}
