use codeseek_code_chunker::{ChunkType, CodeChunk};

/// Characters of chunk content kept in a search result preview
pub const PREVIEW_CHARS: usize = 200;

/// Text sent to the embedding provider for `chunk`: a one-line description of
/// what the chunk is and where it lives, a blank line, then the code.
pub fn chunk_to_text(chunk: &CodeChunk) -> String {
    let mut parts = Vec::new();

    match (chunk.chunk_type, chunk.parent_name.as_deref()) {
        (ChunkType::Method, Some(parent)) => {
            parts.push(format!("Method {} in class {parent}", chunk.name));
        }
        (ChunkType::Function, _) => parts.push(format!("Function {}", chunk.name)),
        (ChunkType::ClassHeader, _) => parts.push(format!("Class {} definition", chunk.name)),
        (ChunkType::Class, _) => parts.push(format!("Class {}", chunk.name)),
        (other, _) => parts.push(format!("{} {}", other.label(), chunk.name)),
    }

    if chunk.language != "unknown" {
        parts.push(format!("({})", chunk.language));
    }
    parts.push(format!("in {}", chunk.file_path));

    if !chunk.metadata.parameters.is_empty() {
        parts.push(format!(
            "with parameters: {}",
            chunk.metadata.parameters.join(", ")
        ));
    }
    if !chunk.metadata.decorators.is_empty() {
        parts.push(format!("decorators: {}", chunk.metadata.decorators.join(", ")));
    }

    format!("{}\n\n{}", parts.join(" "), chunk.content)
}

/// First [`PREVIEW_CHARS`] characters, with `...` when cut.
pub fn content_preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}
