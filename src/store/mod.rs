//! Vector store capability and its backends.
//!
//! `DATABASE_URL` picks the backend by scheme: `postgres://` / `postgresql://`
//! use pgvector, `http://` / `https://` use Qdrant.

mod memory;
mod pgvector;
mod qdrant;

pub use memory::MemoryStore;
pub use pgvector::PgVectorStore;
pub use qdrant::QdrantStore;

use async_trait::async_trait;
use tracing::info;

use crate::error::{RagError, RagResult};
use crate::models::{EmbeddedChunk, ScoredChunk};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Drops `collection` and recreates it holding exactly `records`, tagged
    /// with the identity of the embedder that produced them.
    ///
    /// Not atomic. A failure partway leaves the collection in an undefined
    /// state; callers retry the whole ingestion.
    async fn replace_collection(
        &self,
        collection: &str,
        embedder: &str,
        records: Vec<EmbeddedChunk>,
    ) -> RagResult<usize>;

    /// Up to `k` chunks scoring at least `score_threshold`, best first.
    async fn similarity_search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> RagResult<Vec<ScoredChunk>>;

    /// Number of stored chunks; 0 when the collection does not exist.
    async fn count(&self, collection: &str) -> RagResult<usize>;

    /// The embedder identity recorded at ingestion, if any.
    async fn embedder_identity(&self, collection: &str) -> RagResult<Option<String>>;
}

pub async fn connect(url: &str) -> RagResult<Box<dyn VectorStore>> {
    let scheme = url.split("://").next().unwrap_or_default();
    match scheme {
        "postgres" | "postgresql" => {
            info!("Connecting to pgvector store");
            Ok(Box::new(PgVectorStore::connect(url).await?))
        }
        "http" | "https" => {
            info!("Connecting to Qdrant store at {url}");
            Ok(Box::new(QdrantStore::connect(url)?))
        }
        other => Err(RagError::StoreConnection(format!(
            "unsupported DATABASE_URL scheme '{other}'"
        ))),
    }
}
