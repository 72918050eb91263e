use async_trait::async_trait;
use tracing::info;

use crate::error::{RagError, RagResult};
use crate::models::{Chunk, EmbeddedChunk};

/// Texts sent per embedding request.
pub const EMBED_BATCH: usize = 100;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// `provider:model`, recorded with a collection at ingestion time.
    fn identity(&self) -> String;

    async fn embed_documents(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> RagResult<Vec<f32>>;
}

pub async fn embed_chunks(
    embedder: &dyn EmbeddingProvider,
    chunks: Vec<Chunk>,
) -> RagResult<Vec<EmbeddedChunk>> {
    let mut embedded = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed_documents(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(RagError::UpstreamProvider(format!(
                "embedding result count mismatch: sent {}, got {}",
                batch.len(),
                vectors.len()
            )));
        }
        embedded.extend(
            batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding }),
        );
    }

    info!("Embedded {} chunks with {}", embedded.len(), embedder.identity());
    Ok(embedded)
}
