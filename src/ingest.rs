//! PDF → chunks → embeddings → collection.

use std::path::Path;

use tracing::info;

use crate::config::{ChunkSettings, Settings};
use crate::embedding::{embed_chunks, EmbeddingProvider};
use crate::error::{RagError, RagResult};
use crate::models::Chunk;
use crate::pdf_loader::load_pdf_pages;
use crate::splitter::split_pages;
use crate::store::VectorStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub pages: usize,
    pub chunks: usize,
}

pub fn load_and_split_pdf(path: &Path, chunking: &ChunkSettings) -> RagResult<(usize, Vec<Chunk>)> {
    let pages = load_pdf_pages(path)?;
    let chunks = split_pages(&pages, path, chunking)?;
    info!("Document split into {} chunks", chunks.len());
    Ok((pages.len(), chunks))
}

/// Embeds `chunks` and replaces `collection` with them.
pub async fn store_chunks(
    chunks: Vec<Chunk>,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    collection: &str,
) -> RagResult<usize> {
    if chunks.is_empty() {
        return Err(RagError::Parse("document produced no chunks".to_string()));
    }
    let embedded = embed_chunks(embedder, chunks).await?;

    info!("Replacing collection '{collection}'");
    store
        .replace_collection(collection, &embedder.identity(), embedded)
        .await
}

/// Runs the whole ingestion. Errors abort the run and are not retried; a
/// failed run may leave the collection partially written.
pub async fn ingest_pdf(
    settings: &Settings,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> RagResult<IngestReport> {
    info!("Starting PDF ingestion");

    let (pages, chunks) = load_and_split_pdf(&settings.pdf_path, &settings.chunking)?;
    let stored = store_chunks(chunks, embedder, store, &settings.collection_name).await?;

    info!("Ingestion finished: {stored} chunks stored");
    Ok(IngestReport {
        pages,
        chunks: stored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::FakeEmbedder;
    use crate::models::ChunkMetadata;
    use crate::store::MemoryStore;
    use std::collections::HashMap;

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk {
                content: format!("trecho {i}"),
                metadata: ChunkMetadata {
                    source: "doc.pdf".into(),
                    page: i as u32 + 1,
                },
            })
            .collect()
    }

    #[tokio::test]
    async fn second_ingestion_replaces_the_first() {
        let embedder = FakeEmbedder::new(|_: &str| vec![1.0, 0.0]);
        let store = MemoryStore::new();

        let first = store_chunks(chunks(3), &embedder, &store, "pdf_chunks").await.unwrap();
        let second = store_chunks(chunks(2), &embedder, &store, "pdf_chunks").await.unwrap();

        assert_eq!(first, 3);
        assert_eq!(second, 2);
        assert_eq!(store.count("pdf_chunks").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn records_embedder_identity() {
        let embedder = FakeEmbedder::new(|_: &str| vec![1.0]);
        let store = MemoryStore::new();

        store_chunks(chunks(1), &embedder, &store, "pdf_chunks").await.unwrap();

        assert_eq!(
            store.embedder_identity("pdf_chunks").await.unwrap().as_deref(),
            Some("fake:test-embedding")
        );
    }

    #[tokio::test]
    async fn empty_chunk_list_is_rejected() {
        let embedder = FakeEmbedder::new(|_: &str| vec![1.0]);
        let store = MemoryStore::new();

        let err = store_chunks(Vec::new(), &embedder, &store, "pdf_chunks")
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Parse(_)));
        assert_eq!(store.count("pdf_chunks").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_pdf_aborts_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let vars: HashMap<&str, String> = HashMap::from([(
            "PDF_PATH",
            dir.path().join("absent.pdf").display().to_string(),
        )]);
        let settings = Settings::from_lookup(|k| vars.get(k).cloned());
        let embedder = FakeEmbedder::new(|_: &str| vec![1.0]);
        let store = MemoryStore::new();

        let err = ingest_pdf(&settings, &embedder, &store).await.unwrap_err();

        assert!(matches!(err, RagError::SourceNotFound(_)));
    }
}
