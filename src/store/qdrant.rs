use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeleteCollectionBuilder, Distance, PointStruct,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{RagError, RagResult};
use crate::models::{Chunk, ChunkMetadata, EmbeddedChunk, ScoredChunk};

use super::VectorStore;

const UPSERT_BATCH: usize = 64;

/// Qdrant with cosine distance; one Qdrant collection per collection name.
pub struct QdrantStore {
    client: Qdrant,
}

fn point_payload(record: &EmbeddedChunk, embedder: &str) -> RagResult<Payload> {
    Payload::try_from(json!({
        "document": record.chunk.content,
        "page": record.chunk.metadata.page,
        "source": record.chunk.metadata.source,
        "embedder": embedder,
    }))
    .map_err(|e| RagError::StoreConnection(e.to_string()))
}

fn chunk_from_payload(payload: &HashMap<String, Value>) -> Chunk {
    let text = |key: &str| {
        payload
            .get(key)
            .and_then(|v| v.as_str())
            .cloned()
            .unwrap_or_default()
    };
    Chunk {
        content: text("document"),
        metadata: ChunkMetadata {
            source: text("source"),
            page: payload
                .get("page")
                .and_then(|v| v.as_integer())
                .unwrap_or_default() as u32,
        },
    }
}

impl QdrantStore {
    pub fn connect(url: &str) -> RagResult<Self> {
        Ok(Self {
            client: Qdrant::from_url(url).build()?,
        })
    }

    async fn collection_exists(&self, collection: &str) -> RagResult<bool> {
        Ok(self.client.collection_exists(collection).await?)
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn replace_collection(
        &self,
        collection: &str,
        embedder: &str,
        records: Vec<EmbeddedChunk>,
    ) -> RagResult<usize> {
        if self.collection_exists(collection).await? {
            self.client
                .delete_collection(DeleteCollectionBuilder::new(collection))
                .await?;
            info!("Dropped previous collection '{collection}'");
        }

        let Some(first) = records.first() else {
            return Ok(0);
        };
        let vector_size = first.embedding.len() as u64;
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await?;
        info!("Created collection '{collection}' ({vector_size} dimensions)");

        for batch in records.chunks(UPSERT_BATCH) {
            let points = batch
                .iter()
                .map(|record| {
                    Ok(PointStruct::new(
                        Uuid::new_v4().to_string(),
                        record.embedding.clone(),
                        point_payload(record, embedder)?,
                    ))
                })
                .collect::<RagResult<Vec<_>>>()?;
            self.client
                .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
                .await?;
        }
        Ok(records.len())
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> RagResult<Vec<ScoredChunk>> {
        if !self.collection_exists(collection).await? {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, query.to_vec(), k as u64)
                    .with_payload(true)
                    .score_threshold(score_threshold),
            )
            .await?;

        Ok(response
            .result
            .into_iter()
            .map(|point| ScoredChunk {
                chunk: chunk_from_payload(&point.payload),
                score: point.score,
            })
            .collect())
    }

    async fn count(&self, collection: &str) -> RagResult<usize> {
        if !self.collection_exists(collection).await? {
            return Ok(0);
        }
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await?;
        Ok(response.result.map(|r| r.count).unwrap_or(0) as usize)
    }

    async fn embedder_identity(&self, collection: &str) -> RagResult<Option<String>> {
        if !self.collection_exists(collection).await? {
            return Ok(None);
        }
        let response = self
            .client
            .scroll(ScrollPointsBuilder::new(collection).limit(1).with_payload(true))
            .await?;
        Ok(response
            .result
            .first()
            .and_then(|point| point.payload.get("embedder"))
            .and_then(|v| v.as_str())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                content: "Lucro operacional de R$ 3,2 bi".into(),
                metadata: ChunkMetadata {
                    source: "relatorio.pdf".into(),
                    page: 7,
                },
            },
            embedding: vec![0.1, 0.2],
        }
    }

    #[test]
    fn payload_builds_from_record() {
        assert!(point_payload(&record(), "google:models/embedding-001").is_ok());
    }

    #[test]
    fn chunk_reads_document_page_and_source() {
        let payload: HashMap<String, Value> = HashMap::from([
            ("document".to_string(), Value::from("Lucro operacional de R$ 3,2 bi")),
            ("page".to_string(), Value::from(7_i64)),
            ("source".to_string(), Value::from("relatorio.pdf")),
        ]);

        let chunk = chunk_from_payload(&payload);

        assert_eq!(chunk, record().chunk);
    }

    #[test]
    fn missing_payload_fields_default() {
        let chunk = chunk_from_payload(&HashMap::new());

        assert_eq!(chunk.content, "");
        assert_eq!(chunk.metadata.page, 0);
    }

    #[tokio::test]
    #[ignore = "requires a Qdrant instance on http://localhost:6334"]
    async fn replace_is_not_append() {
        let store = QdrantStore::connect("http://localhost:6334").unwrap();
        let three = vec![record(), record(), record()];
        let two = vec![record(), record()];

        store.replace_collection("qdrant_test", "fake", three).await.unwrap();
        store.replace_collection("qdrant_test", "fake", two).await.unwrap();

        assert_eq!(store.count("qdrant_test").await.unwrap(), 2);
    }
}
