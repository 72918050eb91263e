use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RagResult;
use crate::models::{EmbeddedChunk, ScoredChunk};

use super::VectorStore;

struct MemoryCollection {
    embedder: String,
    records: Vec<EmbeddedChunk>,
}

/// In-process store with exact cosine search. Nothing is persisted.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, MemoryCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn replace_collection(
        &self,
        collection: &str,
        embedder: &str,
        records: Vec<EmbeddedChunk>,
    ) -> RagResult<usize> {
        let count = records.len();
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections.insert(
            collection.to_string(),
            MemoryCollection {
                embedder: embedder.to_string(),
                records,
            },
        );
        Ok(count)
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> RagResult<Vec<ScoredChunk>> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        let Some(stored) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<ScoredChunk> = stored
            .records
            .iter()
            .map(|r| ScoredChunk {
                chunk: r.chunk.clone(),
                score: cosine_similarity(query, &r.embedding),
            })
            .filter(|hit| hit.score >= score_threshold)
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> RagResult<usize> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        Ok(collections.get(collection).map_or(0, |c| c.records.len()))
    }

    async fn embedder_identity(&self, collection: &str) -> RagResult<Option<String>> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        Ok(collections.get(collection).map(|c| c.embedder.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, ChunkMetadata};

    fn record(content: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                content: content.to_string(),
                metadata: ChunkMetadata {
                    source: "doc.pdf".into(),
                    page: 1,
                },
            },
            embedding,
        }
    }

    #[test]
    fn cosine_of_identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn replace_does_not_append() {
        let store = MemoryStore::new();
        let three = vec![
            record("a", vec![1.0]),
            record("b", vec![1.0]),
            record("c", vec![1.0]),
        ];
        let two = vec![record("d", vec![1.0]), record("e", vec![1.0])];

        store.replace_collection("docs", "fake", three).await.unwrap();
        store.replace_collection("docs", "fake", two).await.unwrap();

        assert_eq!(store.count("docs").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn search_applies_threshold_order_and_limit() {
        let store = MemoryStore::new();
        let records = vec![
            record("close", vec![0.9, 0.1]),
            record("exact", vec![1.0, 0.0]),
            record("far", vec![0.0, 1.0]),
        ];
        store.replace_collection("docs", "fake", records).await.unwrap();

        let hits = store
            .similarity_search("docs", &[1.0, 0.0], 10, 0.7)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.content, "exact");
        assert_eq!(hits[1].chunk.content, "close");

        let top1 = store
            .similarity_search("docs", &[1.0, 0.0], 1, 0.7)
            .await
            .unwrap();
        assert_eq!(top1.len(), 1);
    }

    #[tokio::test]
    async fn unknown_collection_is_empty() {
        let store = MemoryStore::new();

        assert_eq!(store.count("missing").await.unwrap(), 0);
        assert!(store.embedder_identity("missing").await.unwrap().is_none());
        assert!(store
            .similarity_search("missing", &[1.0], 10, 0.0)
            .await
            .unwrap()
            .is_empty());
    }
}
