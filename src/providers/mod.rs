//! Concrete embedding/chat backends, selected from the resolved provider config.

mod google;
mod openai;

pub use google::GoogleClient;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use tracing::info;

use crate::config::ProviderConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, RagResult};
use crate::llm::ChatProvider;

pub enum Provider {
    Google(GoogleClient),
    OpenAi(OpenAiClient),
}

impl Provider {
    pub fn from_config(config: &ProviderConfig) -> Self {
        let models = &config.settings().models;
        info!(
            "Using {} ({} + {})",
            config.label(),
            models.embedding,
            models.chat
        );
        match config {
            ProviderConfig::Google(settings) => Provider::Google(GoogleClient::new(settings.clone())),
            ProviderConfig::OpenAi(settings) => Provider::OpenAi(OpenAiClient::new(settings.clone())),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for Provider {
    fn identity(&self) -> String {
        match self {
            Provider::Google(c) => c.identity(),
            Provider::OpenAi(c) => c.identity(),
        }
    }

    async fn embed_documents(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>> {
        match self {
            Provider::Google(c) => c.embed_documents(texts).await,
            Provider::OpenAi(c) => c.embed_documents(texts).await,
        }
    }

    async fn embed_query(&self, text: &str) -> RagResult<Vec<f32>> {
        match self {
            Provider::Google(c) => c.embed_query(text).await,
            Provider::OpenAi(c) => c.embed_query(text).await,
        }
    }
}

#[async_trait]
impl ChatProvider for Provider {
    fn model(&self) -> &str {
        match self {
            Provider::Google(c) => c.model(),
            Provider::OpenAi(c) => c.model(),
        }
    }

    async fn complete(&self, prompt: &str) -> RagResult<String> {
        match self {
            Provider::Google(c) => c.complete(prompt).await,
            Provider::OpenAi(c) => c.complete(prompt).await,
        }
    }
}

/// Turns a non-2xx response into an `UpstreamProvider` error carrying the body.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> RagResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(RagError::UpstreamProvider(format!(
        "{provider} request failed: {status} {body}"
    )))
}
