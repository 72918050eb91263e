//! Retrieval-augmented answering: embed, search, prompt, complete.

use tracing::{error, info, warn};

use crate::config::Settings;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, RagResult};
use crate::llm::ChatProvider;
use crate::models::{Answer, SourcePreview};
use crate::prompt::{build_context, build_prompt};
use crate::store::VectorStore;

/// What the shell gets back for a question. Failures are values so the loop
/// can report them and keep going.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Answered(Answer),
    Failed(String),
}

pub struct RagPipeline<'a> {
    settings: &'a Settings,
    embedder: &'a dyn EmbeddingProvider,
    chat: &'a dyn ChatProvider,
    store: &'a dyn VectorStore,
}

impl<'a> RagPipeline<'a> {
    pub fn new(
        settings: &'a Settings,
        embedder: &'a dyn EmbeddingProvider,
        chat: &'a dyn ChatProvider,
        store: &'a dyn VectorStore,
    ) -> Self {
        Self {
            settings,
            embedder,
            chat,
            store,
        }
    }

    pub async fn answer(&self, question: &str) -> RagResult<Answer> {
        info!("Processing question: {question}");
        let collection = &self.settings.collection_name;
        let retrieval = &self.settings.retrieval;

        self.check_embedder_identity(collection).await?;

        let query = self.embedder.embed_query(question).await?;
        let hits = self
            .store
            .similarity_search(collection, &query, retrieval.top_k, retrieval.score_threshold)
            .await?;

        if hits.is_empty() && self.store.count(collection).await? == 0 {
            return Err(RagError::EmptyCollection(collection.clone()));
        }

        let prompt = build_prompt(&build_context(&hits), question);
        let answer = self.chat.complete(&prompt).await?;

        info!(
            "Answer generated by {} from {} sources",
            self.chat.model(),
            hits.len()
        );
        Ok(Answer {
            answer,
            sources: hits
                .iter()
                .map(|hit| SourcePreview::from_chunk(&hit.chunk, retrieval.preview_chars))
                .collect(),
        })
    }

    pub async fn search_and_answer(&self, question: &str) -> SearchOutcome {
        match self.answer(question).await {
            Ok(answer) => SearchOutcome::Answered(answer),
            Err(e) => {
                error!("Search and answer failed: {e}");
                SearchOutcome::Failed(format!("Erro: {e}"))
            }
        }
    }

    /// Vectors from a different model make scores meaningless; warn, don't block.
    async fn check_embedder_identity(&self, collection: &str) -> RagResult<()> {
        let current = self.embedder.identity();
        if let Some(stored) = self.store.embedder_identity(collection).await? {
            if stored != current {
                warn!(
                    "Collection '{collection}' was embedded with {stored} but queries use {current}; \
                     similarity scores will be unreliable until the PDF is re-ingested"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::FakeEmbedder;
    use crate::llm::testing::{FailingChat, RecordingChat};
    use crate::models::{Chunk, ChunkMetadata, EmbeddedChunk};
    use crate::prompt::{context_section, REFUSAL};
    use crate::store::MemoryStore;

    fn settings() -> Settings {
        Settings::from_lookup(|_| None)
    }

    /// Two-axis toy embedding: finance words point one way, everything else the other.
    fn topic_embedding(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let finance = ["receita", "lucro", "faturamento", "ebitda"]
            .iter()
            .any(|w| lower.contains(w));
        if finance {
            vec![1.0, 0.0]
        } else {
            vec![0.0, 1.0]
        }
    }

    /// Honours the prompt contract: refuses whenever the context is empty.
    fn contract_chat(prompt: &str) -> String {
        match context_section(prompt) {
            Some("") | None => REFUSAL.to_string(),
            Some(context) => format!("Segundo o contexto: {}", context.lines().next().unwrap_or("")),
        }
    }

    async fn financial_store() -> MemoryStore {
        let store = MemoryStore::new();
        let texts = [
            "Receita líquida de R$ 1,2 bilhão em 2023.",
            "Lucro operacional cresceu 8% no ano.",
            "EBITDA ajustado atingiu R$ 300 milhões.",
        ];
        let records = texts
            .iter()
            .enumerate()
            .map(|(i, t)| EmbeddedChunk {
                chunk: Chunk {
                    content: t.to_string(),
                    metadata: ChunkMetadata {
                        source: "relatorio.pdf".into(),
                        page: i as u32 + 1,
                    },
                },
                embedding: topic_embedding(t),
            })
            .collect();
        store
            .replace_collection("pdf_chunks", "fake:test-embedding", records)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn unrelated_question_gets_refusal() {
        let settings = settings();
        let embedder = FakeEmbedder::new(topic_embedding);
        let chat = RecordingChat::new(contract_chat);
        let store = financial_store().await;
        let pipeline = RagPipeline::new(&settings, &embedder, &chat, &store);

        let outcome = pipeline.search_and_answer("What color is the sky?").await;

        match outcome {
            SearchOutcome::Answered(answer) => {
                assert_eq!(answer.answer, "Não tenho informações necessárias para responder sua pergunta.");
                assert!(answer.sources.is_empty());
            }
            SearchOutcome::Failed(msg) => panic!("unexpected failure: {msg}"),
        }
    }

    #[tokio::test]
    async fn below_threshold_sends_empty_context() {
        let settings = settings();
        let embedder = FakeEmbedder::new(topic_embedding);
        let chat = RecordingChat::new(contract_chat);
        let store = financial_store().await;
        let pipeline = RagPipeline::new(&settings, &embedder, &chat, &store);

        pipeline.answer("Qual a cor do céu?").await.unwrap();

        let prompts = chat.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(context_section(&prompts[0]), Some(""));
        assert!(prompts[0].contains("Qual a cor do céu?"));
    }

    #[tokio::test]
    async fn matching_question_uses_retrieved_context() {
        let settings = settings();
        let embedder = FakeEmbedder::new(topic_embedding);
        let chat = RecordingChat::new(contract_chat);
        let store = financial_store().await;
        let pipeline = RagPipeline::new(&settings, &embedder, &chat, &store);

        let answer = pipeline.answer("Qual foi a receita?").await.unwrap();

        assert_eq!(answer.sources.len(), 3);
        assert!(answer.answer.starts_with("Segundo o contexto"));
        let context = context_section(&chat.prompts()[0]).unwrap().to_string();
        assert!(context.contains("Lucro operacional"));
        assert!(answer.sources.iter().all(|s| s.metadata.source == "relatorio.pdf"));
    }

    #[tokio::test]
    async fn sources_are_truncated_previews() {
        let settings = settings();
        let embedder = FakeEmbedder::new(|_: &str| vec![1.0]);
        let chat = RecordingChat::new(|_: &str| "ok".to_string());
        let store = MemoryStore::new();
        let long = EmbeddedChunk {
            chunk: Chunk {
                content: "receita ".repeat(60),
                metadata: ChunkMetadata {
                    source: "doc.pdf".into(),
                    page: 2,
                },
            },
            embedding: vec![1.0],
        };
        store
            .replace_collection("pdf_chunks", "fake:test-embedding", vec![long])
            .await
            .unwrap();
        let pipeline = RagPipeline::new(&settings, &embedder, &chat, &store);

        let answer = pipeline.answer("receita?").await.unwrap();

        assert_eq!(answer.sources[0].content.chars().count(), 203);
        assert_eq!(answer.sources[0].metadata.page, 2);
    }

    #[tokio::test]
    async fn empty_collection_is_reported() {
        let settings = settings();
        let embedder = FakeEmbedder::new(topic_embedding);
        let chat = RecordingChat::new(contract_chat);
        let store = MemoryStore::new();
        let pipeline = RagPipeline::new(&settings, &embedder, &chat, &store);

        let err = pipeline.answer("Qual a receita?").await.unwrap_err();

        assert!(matches!(err, RagError::EmptyCollection(name) if name == "pdf_chunks"));
        assert!(chat.prompts().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_becomes_displayable_outcome() {
        let settings = settings();
        let embedder = FakeEmbedder::new(topic_embedding);
        let store = financial_store().await;
        let pipeline = RagPipeline::new(&settings, &embedder, &FailingChat, &store);

        let outcome = pipeline.search_and_answer("Qual a receita?").await;

        match outcome {
            SearchOutcome::Failed(msg) => {
                assert!(msg.starts_with("Erro:"));
                assert!(msg.contains("429"));
            }
            SearchOutcome::Answered(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn embedder_mismatch_still_answers() {
        let settings = settings();
        let mut embedder = FakeEmbedder::new(topic_embedding);
        embedder.identity = "openai:text-embedding-3-small".to_string();
        let chat = RecordingChat::new(contract_chat);
        let store = financial_store().await;
        let pipeline = RagPipeline::new(&settings, &embedder, &chat, &store);

        let answer = pipeline.answer("Qual a receita?").await.unwrap();

        assert!(!answer.sources.is_empty());
    }
}
