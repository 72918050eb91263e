use async_trait::async_trait;
use serde_json::json;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RagResult;
use crate::models::{Chunk, ChunkMetadata, EmbeddedChunk, ScoredChunk};

use super::VectorStore;

const SCHEMA: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS vector",
    "CREATE TABLE IF NOT EXISTS rag_collections (
        uuid UUID PRIMARY KEY,
        name VARCHAR NOT NULL UNIQUE,
        cmetadata JSONB
    )",
    "CREATE TABLE IF NOT EXISTS rag_embeddings (
        id VARCHAR PRIMARY KEY,
        collection_id UUID NOT NULL REFERENCES rag_collections(uuid) ON DELETE CASCADE,
        embedding VECTOR,
        document TEXT NOT NULL,
        cmetadata JSONB
    )",
    "CREATE INDEX IF NOT EXISTS rag_embeddings_collection_idx ON rag_embeddings (collection_id)",
];

/// PostgreSQL + pgvector. Scores are cosine similarity (`1 - <=>`).
pub struct PgVectorStore {
    pool: PgPool,
}

/// pgvector text literal, e.g. `[0.1,0.2]`.
fn vector_literal(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// NaN scores (zero vectors under `<=>`) never pass.
fn passes_threshold(score: f32, threshold: f32) -> bool {
    !score.is_nan() && score >= threshold
}

impl PgVectorStore {
    pub async fn connect(url: &str) -> RagResult<Self> {
        let pool = PgPoolOptions::new().max_connections(1).connect(url).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> RagResult<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn replace_collection(
        &self,
        collection: &str,
        embedder: &str,
        records: Vec<EmbeddedChunk>,
    ) -> RagResult<usize> {
        let deleted = sqlx::query("DELETE FROM rag_collections WHERE name = $1")
            .bind(collection)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() > 0 {
            info!("Dropped previous collection '{collection}'");
        }

        let collection_id = Uuid::new_v4();
        sqlx::query("INSERT INTO rag_collections (uuid, name, cmetadata) VALUES ($1, $2, $3)")
            .bind(collection_id)
            .bind(collection)
            .bind(Json(json!({ "embedder": embedder })))
            .execute(&self.pool)
            .await?;

        let total = records.len();
        for record in records {
            sqlx::query(
                "INSERT INTO rag_embeddings (id, collection_id, embedding, document, cmetadata)
                 VALUES ($1, $2, $3::vector, $4, $5)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(collection_id)
            .bind(vector_literal(&record.embedding))
            .bind(&record.chunk.content)
            .bind(Json(&record.chunk.metadata))
            .execute(&self.pool)
            .await?;
        }

        debug!("Inserted {total} rows into '{collection}'");
        Ok(total)
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> RagResult<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            "SELECT e.document, e.cmetadata, 1 - (e.embedding <=> $1::vector) AS score
             FROM rag_embeddings e
             JOIN rag_collections c ON e.collection_id = c.uuid
             WHERE c.name = $2
             ORDER BY e.embedding <=> $1::vector
             LIMIT $3",
        )
        .bind(vector_literal(query))
        .bind(collection)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let score: f64 = row.try_get("score")?;
            if !passes_threshold(score as f32, score_threshold) {
                continue;
            }
            let Json(metadata): Json<ChunkMetadata> = row.try_get("cmetadata")?;
            hits.push(ScoredChunk {
                chunk: Chunk {
                    content: row.try_get("document")?,
                    metadata,
                },
                score: score as f32,
            });
        }
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> RagResult<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rag_embeddings e
             JOIN rag_collections c ON e.collection_id = c.uuid
             WHERE c.name = $1",
        )
        .bind(collection)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as usize)
    }

    async fn embedder_identity(&self, collection: &str) -> RagResult<Option<String>> {
        let identity: Option<Option<String>> =
            sqlx::query_scalar("SELECT cmetadata->>'embedder' FROM rag_collections WHERE name = $1")
                .bind(collection)
                .fetch_optional(&self.pool)
                .await?;
        Ok(identity.flatten())
    }
}
