//! Question answering over a single PDF: ingest it into a vector store, then
//! answer questions strictly from the retrieved chunks.

pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod pdf_loader;
pub mod prompt;
pub mod providers;
pub mod search;
pub mod shell;
pub mod splitter;
pub mod store;

pub use config::{ProviderConfig, Settings};
pub use error::{RagError, RagResult};
pub use ingest::{ingest_pdf, IngestReport};
pub use models::{Answer, Chunk, ChunkMetadata, SourcePreview};
pub use providers::Provider;
pub use search::{RagPipeline, SearchOutcome};
pub use shell::{validate_system, Shell, SystemStatus};
pub use store::VectorStore;
