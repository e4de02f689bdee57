use crate::access::FileAccessPolicy;
use crate::block::{CodeBlock, FunctionBlock};
use crate::config::SplitterConfig;
use crate::error::ChunkerError;
use crate::language::Language;
use crate::parser::{StructuralParser, default_parser};
use crate::strategy::{TokenBudget, line_windows};
use crate::{ChunkMetadata, ChunkType, CodeChunk, SplitInfo};
use codeseek_utils_tokenizer::Tokenizer;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log::{debug, info};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Log sweep progress every this many files that produced chunks.
const PROGRESS_EVERY: usize = 50;

/// Turns workspace files into [`CodeChunk`]s.
pub struct CodeSplitter {
    workspace_root: PathBuf,
    config: SplitterConfig,
    access: FileAccessPolicy,
    parser: Box<dyn StructuralParser>,
    tokenizer: Tokenizer,
    excluded_dirs: Vec<PathBuf>,
}

/// Everything about a chunk except where its text sits.
struct ChunkSeed<'a> {
    file_path: &'a str,
    language: Language,
    chunk_type: ChunkType,
    name: String,
    parent_name: Option<String>,
    metadata: ChunkMetadata,
}

impl CodeSplitter {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        config: SplitterConfig,
        access: FileAccessPolicy,
    ) -> Result<Self, ChunkerError> {
        config.validate().map_err(ChunkerError::InvalidConfig)?;
        let parser = default_parser(config.enable_parsing);
        Ok(Self {
            workspace_root: workspace_root.into(),
            config,
            access,
            parser,
            tokenizer: Tokenizer::try_default(),
            excluded_dirs: Vec::new(),
        })
    }

    /// Replace the structural parser backend.
    pub fn with_parser(mut self, parser: Box<dyn StructuralParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Never descend into `dir` during a sweep. Accepts absolute paths under
    /// the workspace root or workspace-relative ones.
    pub fn exclude_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let relative = dir.strip_prefix(&self.workspace_root).unwrap_or(dir);
        self.excluded_dirs.push(relative.to_path_buf());
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Split one workspace-relative file.
    ///
    /// `content` is read from disk when absent. Denied, unreadable, binary and
    /// blank files yield no chunks.
    pub fn split_file(&self, file_path: &str, content: Option<&str>) -> Vec<CodeChunk> {
        let relative = Path::new(file_path);
        if let Err(reason) = self.access.check_path(relative) {
            debug!("Skipping {file_path}: {reason}");
            return Vec::new();
        }

        let content: Cow<'_, str> = match content {
            Some(text) => {
                if let Err(reason) = self.access.check_size(text.len() as u64) {
                    debug!("Skipping {file_path}: {reason}");
                    return Vec::new();
                }
                Cow::Borrowed(text)
            }
            None => match self.read_file(relative) {
                Some(text) => Cow::Owned(text),
                None => return Vec::new(),
            },
        };

        if content.trim().is_empty() {
            return Vec::new();
        }

        let language = Language::detect(relative, &content);
        let lines: Vec<&str> = content.lines().collect();

        let mut chunks = Vec::new();
        if self.parser.supports(language) {
            match self.parser.parse(&content, language) {
                Ok(blocks) => {
                    chunks = self.structural_chunks(file_path, &lines, language, &blocks);
                }
                Err(err) => {
                    debug!("Structural parse of {file_path} failed, using line windows: {err}");
                }
            }
        }

        if chunks.is_empty() {
            chunks = self.window_chunks(file_path, &lines, language, ChunkType::TextChunk);
        }

        assign_ids(&mut chunks);
        chunks
    }

    /// Split every matching, access-allowed file under the workspace root.
    ///
    /// Patterns are globs relative to the root (`**/*.py`, `src/*.rs`); with
    /// none, every allowed file is visited. Files are visited in path order.
    /// A file that fails is skipped.
    pub fn split_workspace(
        &self,
        file_patterns: Option<&[String]>,
    ) -> Result<Vec<CodeChunk>, ChunkerError> {
        let matcher = match file_patterns {
            Some(patterns) if !patterns.is_empty() => Some(build_matcher(patterns)?),
            _ => None,
        };

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.workspace_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.should_descend(entry));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping unreadable entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = self.relative_path(entry.path()) else {
                continue;
            };
            if let Some(matcher) = &matcher {
                if !matcher.is_match(&relative) {
                    continue;
                }
            }
            files.push(relative);
        }

        info!("Processing {} files for code splitting", files.len());

        let mut chunks = Vec::new();
        let mut processed = 0;
        for file in &files {
            let file_chunks = self.split_file(file, None);
            if file_chunks.is_empty() {
                continue;
            }
            processed += 1;
            chunks.extend(file_chunks);
            if processed % PROGRESS_EVERY == 0 {
                info!("Processed {processed} files, {} chunks created", chunks.len());
            }
        }

        info!(
            "Code splitting complete: {processed} files, {} chunks",
            chunks.len()
        );
        Ok(chunks)
    }

    fn should_descend(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let Ok(relative) = entry.path().strip_prefix(&self.workspace_root) else {
            return true;
        };
        if self.excluded_dirs.iter().any(|dir| dir == relative) {
            debug!("Pruning excluded directory {}", relative.display());
            return false;
        }
        self.access.check_components(relative).is_ok()
    }

    fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.workspace_root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    fn read_file(&self, relative: &Path) -> Option<String> {
        let full_path = self.workspace_root.join(relative);
        let metadata = match std::fs::metadata(&full_path) {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!("Failed to stat {}: {err}", relative.display());
                return None;
            }
        };
        if let Err(reason) = self.access.check_size(metadata.len()) {
            debug!("Skipping {}: {reason}", relative.display());
            return None;
        }

        let bytes = match std::fs::read(&full_path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!("Failed to read {}: {err}", relative.display());
                return None;
            }
        };
        if bytes.contains(&0) {
            debug!("Skipping binary file {}", relative.display());
            return None;
        }
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn structural_chunks(
        &self,
        file_path: &str,
        lines: &[&str],
        language: Language,
        blocks: &[CodeBlock],
    ) -> Vec<CodeChunk> {
        let mut chunks = Vec::new();
        let seed = |chunk_type, name: &str, parent_name, metadata| ChunkSeed {
            file_path,
            language,
            chunk_type,
            name: name.to_string(),
            parent_name,
            metadata,
        };

        for block in blocks {
            match block {
                CodeBlock::Class(class) if class.methods.is_empty() => {
                    let metadata = ChunkMetadata {
                        base_classes: class.base_classes.clone(),
                        decorators: class.decorators.clone(),
                        ..Default::default()
                    };
                    self.emit(
                        seed(ChunkType::Class, &class.span.name, None, metadata),
                        &line_slice(lines, class.span.start_line, class.span.end_line),
                        class.span.start_line,
                        &mut chunks,
                    );
                }
                CodeBlock::Class(class) => {
                    let metadata = ChunkMetadata {
                        base_classes: class.base_classes.clone(),
                        decorators: class.decorators.clone(),
                        ..Default::default()
                    };
                    self.emit(
                        seed(ChunkType::ClassHeader, &class.span.name, None, metadata),
                        &line_slice(lines, class.span.start_line, class.header_end_line),
                        class.span.start_line,
                        &mut chunks,
                    );
                    for method in &class.methods {
                        self.emit(
                            seed(
                                ChunkType::Method,
                                &method.span.name,
                                Some(class.span.name.clone()),
                                function_metadata(method),
                            ),
                            &line_slice(lines, method.span.start_line, method.span.end_line),
                            method.span.start_line,
                            &mut chunks,
                        );
                    }
                }
                CodeBlock::Function(function) => {
                    self.emit(
                        seed(
                            ChunkType::Function,
                            &function.span.name,
                            None,
                            function_metadata(function),
                        ),
                        &line_slice(lines, function.span.start_line, function.span.end_line),
                        function.span.start_line,
                        &mut chunks,
                    );
                }
                CodeBlock::Method(method) => {
                    let span = &method.function.span;
                    let parent = (!method.parent.is_empty()).then(|| method.parent.clone());
                    self.emit(
                        seed(
                            ChunkType::Method,
                            &span.name,
                            parent,
                            function_metadata(&method.function),
                        ),
                        &line_slice(lines, span.start_line, span.end_line),
                        span.start_line,
                        &mut chunks,
                    );
                }
                CodeBlock::Generic(generic) => {
                    self.emit(
                        seed(
                            ChunkType::Block,
                            &generic.span.name,
                            None,
                            ChunkMetadata::default(),
                        ),
                        &line_slice(lines, generic.span.start_line, generic.span.end_line),
                        generic.span.start_line,
                        &mut chunks,
                    );
                }
            }
        }

        if chunks.len() < self.config.min_structural_chunks {
            chunks.extend(self.window_chunks(file_path, lines, language, ChunkType::Context));
        }
        chunks
    }

    fn window_chunks(
        &self,
        file_path: &str,
        lines: &[&str],
        language: Language,
        chunk_type: ChunkType,
    ) -> Vec<CodeChunk> {
        let prefix = match chunk_type {
            ChunkType::Context => "context",
            _ => "chunk",
        };
        let mut chunks = Vec::new();
        for (i, (start_line, _, text)) in line_windows(lines, self.config.window_lines()).enumerate()
        {
            let seed = ChunkSeed {
                file_path,
                language,
                chunk_type,
                name: format!("{prefix}_{}", i + 1),
                parent_name: None,
                metadata: ChunkMetadata::default(),
            };
            self.emit(seed, &text, start_line, &mut chunks);
        }
        chunks
    }

    /// Push one chunk for `text`, or several `_partN` chunks when it is over
    /// the token budget. Text under the character floor is dropped.
    fn emit(&self, seed: ChunkSeed<'_>, text: &str, start_line: usize, out: &mut Vec<CodeChunk>) {
        if text.trim().chars().count() < self.config.min_chunk_chars {
            return;
        }

        let budget = TokenBudget::new(&self.tokenizer, self.config.max_tokens);
        let parts: Vec<_> = budget
            .split(text, start_line)
            .into_iter()
            .filter(|part| !part.text.trim().is_empty())
            .collect();
        let total_parts = parts.len();
        if total_parts > 1 {
            debug!(
                "{} `{}` in {} exceeds {} tokens, split into {total_parts} parts",
                seed.chunk_type,
                seed.name,
                seed.file_path,
                self.config.max_tokens
            );
        }

        for (i, part) in parts.into_iter().enumerate() {
            let mut metadata = seed.metadata.clone();
            let name = if total_parts > 1 {
                metadata.split = Some(SplitInfo {
                    part_number: i + 1,
                    total_parts,
                });
                format!("{}_part{}", seed.name, i + 1)
            } else {
                seed.name.clone()
            };
            out.push(CodeChunk {
                id: String::new(),
                content: part.text,
                file_path: seed.file_path.to_string(),
                start_line: part.start_line,
                end_line: part.end_line,
                chunk_type: seed.chunk_type,
                name,
                parent_name: seed.parent_name.clone(),
                language: seed.language.name().to_string(),
                metadata,
            });
        }
    }
}

fn function_metadata(function: &FunctionBlock) -> ChunkMetadata {
    ChunkMetadata {
        parameters: function.parameters.clone(),
        decorators: function.decorators.clone(),
        is_async: function.is_async,
        is_static: function.is_static,
        ..Default::default()
    }
}

/// Lines `start..=end` (1-based), clamped to the file.
fn line_slice(lines: &[&str], start: usize, end: usize) -> String {
    let start = start.max(1);
    let end = end.min(lines.len());
    if start > end {
        return String::new();
    }
    lines[start - 1..end].join("\n")
}

/// Content-derived ids; a repeat within the file gets a `~N` suffix.
fn assign_ids(chunks: &mut [CodeChunk]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for chunk in chunks {
        let base = CodeChunk::compute_id(&chunk.file_path, chunk.start_line, &chunk.content);
        let count = seen.entry(base.clone()).or_insert(0);
        chunk.id = if *count == 0 {
            base
        } else {
            format!("{base}~{count}")
        };
        *count += 1;
    }
}

fn build_matcher(patterns: &[String]) -> Result<GlobSet, ChunkerError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let normalized = pattern.trim_start_matches("./");
        let glob = GlobBuilder::new(normalized)
            .literal_separator(true)
            .build()
            .map_err(|source| ChunkerError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ChunkerError::InvalidPattern {
        pattern: patterns.join(", "),
        source,
    })
}
