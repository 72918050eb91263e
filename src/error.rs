//! Error taxonomy shared by the ingestion and answer pipelines.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("no provider credentials: set GOOGLE_API_KEY or OPENAI_API_KEY")]
    MissingCredentials,

    #[error("PDF file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("vector store error: {0}")]
    StoreConnection(String),

    #[error("collection '{0}' has no documents")]
    EmptyCollection(String),

    #[error("provider request failed: {0}")]
    UpstreamProvider(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<sqlx::Error> for RagError {
    fn from(e: sqlx::Error) -> Self {
        RagError::StoreConnection(e.to_string())
    }
}

impl From<qdrant_client::QdrantError> for RagError {
    fn from(e: qdrant_client::QdrantError) -> Self {
        RagError::StoreConnection(e.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(e: reqwest::Error) -> Self {
        RagError::UpstreamProvider(e.to_string())
    }
}

pub type RagResult<T> = Result<T, RagError>;
