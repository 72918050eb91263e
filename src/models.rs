use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    /// 1-based page number in the source PDF.
    pub page: u32,
}

/// A span of document text stored as one retrievable unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A chunk together with the vector it was embedded to, ready for the store.
#[derive(Clone, Debug)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourcePreview {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl SourcePreview {
    pub fn from_chunk(chunk: &Chunk, max_chars: usize) -> Self {
        Self {
            content: preview(&chunk.content, max_chars),
            metadata: chunk.metadata.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourcePreview>,
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_short_text() {
        assert_eq!(preview("receita líquida", 200), "receita líquida");
    }

    #[test]
    fn preview_truncates_long_text() {
        let text = "a".repeat(250);
        let p = preview(&text, 200);

        assert_eq!(p.len(), 203);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let text = "ção".repeat(100);
        let p = preview(&text, 200);

        assert_eq!(p.chars().count(), 203);
    }

    #[test]
    fn source_preview_keeps_metadata() {
        let chunk = Chunk {
            content: "x".repeat(300),
            metadata: ChunkMetadata {
                source: "report.pdf".into(),
                page: 4,
            },
        };
        let source = SourcePreview::from_chunk(&chunk, 200);

        assert_eq!(source.metadata.page, 4);
        assert_eq!(source.metadata.source, "report.pdf");
        assert_eq!(source.content.chars().count(), 203);
    }
}
