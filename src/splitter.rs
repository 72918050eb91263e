use std::path::Path;

use text_splitter::{Characters, ChunkConfig, TextSplitter};

use crate::config::ChunkSettings;
use crate::error::{RagError, RagResult};
use crate::models::{Chunk, ChunkMetadata};
use crate::pdf_loader::PdfPageText;

/// Character-sized splitter. Prefers paragraph, then line, then word, then
/// character boundaries, and lets neighbours share up to `overlap` characters.
pub fn build_splitter(settings: &ChunkSettings) -> RagResult<TextSplitter<Characters>> {
    let config = ChunkConfig::new(settings.size)
        .with_overlap(settings.overlap)
        .map_err(|e| RagError::Config(e.to_string()))?;
    Ok(TextSplitter::new(config))
}

pub fn split(text: &str, splitter: &TextSplitter<Characters>) -> Vec<String> {
    splitter.chunks(text).map(|s| s.to_string()).collect()
}

/// Splits each page on its own so every chunk maps to exactly one page.
pub fn split_pages(
    pages: &[PdfPageText],
    source: &Path,
    settings: &ChunkSettings,
) -> RagResult<Vec<Chunk>> {
    let splitter = build_splitter(settings)?;
    let source = source.display().to_string();

    let mut chunks = Vec::new();
    for page in pages {
        chunks.extend(split(&page.text, &splitter).into_iter().map(|content| Chunk {
            content,
            metadata: ChunkMetadata {
                source: source.clone(),
                page: page.page_number,
            },
        }));
    }
    Ok(chunks)
}
