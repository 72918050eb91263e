//! Google Generative Language API client (embeddings + Gemini chat).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderSettings;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, RagResult};
use crate::llm::ChatProvider;

use super::check_status;

const TASK_DOCUMENT: &str = "RETRIEVAL_DOCUMENT";
const TASK_QUERY: &str = "RETRIEVAL_QUERY";

pub struct GoogleClient {
    client: Client,
    settings: ProviderSettings,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Gemini addresses models as `models/<name>`; accept either spelling.
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

fn embed_request(model: &str, text: &str, task_type: &'static str) -> EmbedContentRequest {
    EmbedContentRequest {
        model: model_path(model),
        content: Content {
            role: None,
            parts: vec![Part {
                text: text.to_string(),
            }],
        },
        task_type,
    }
}

fn generate_request(prompt: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        }],
        generation_config: GenerationConfig { temperature: 0.0 },
    }
}

fn answer_text(response: GenerateResponse) -> RagResult<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| RagError::UpstreamProvider("gemini returned no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    Ok(text)
}

impl GoogleClient {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    async fn post<B: Serialize + ?Sized>(&self, url: String, body: &B) -> RagResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(body)
            .send()
            .await?;
        check_status("gemini", response).await
    }
}

#[async_trait]
impl EmbeddingProvider for GoogleClient {
    fn identity(&self) -> String {
        format!("google:{}", self.settings.models.embedding)
    }

    async fn embed_documents(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = &self.settings.models.embedding;
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|t| embed_request(model, t, TASK_DOCUMENT))
                .collect(),
        };
        let url = format!("{}/v1beta/{}:batchEmbedContents", self.base_url(), model_path(model));
        debug!("gemini batch embed of {} texts", texts.len());

        let response: BatchEmbedResponse = self.post(url, &request).await?.json().await?;
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }

    async fn embed_query(&self, text: &str) -> RagResult<Vec<f32>> {
        let model = &self.settings.models.embedding;
        let request = embed_request(model, text, TASK_QUERY);
        let url = format!("{}/v1beta/{}:embedContent", self.base_url(), model_path(model));

        let response: EmbedContentResponse = self.post(url, &request).await?.json().await?;
        Ok(response.embedding.values)
    }
}

#[async_trait]
impl ChatProvider for GoogleClient {
    fn model(&self) -> &str {
        &self.settings.models.chat
    }

    async fn complete(&self, prompt: &str) -> RagResult<String> {
        let url = format!(
            "{}/v1beta/{}:generateContent",
            self.base_url(),
            model_path(&self.settings.models.chat)
        );
        let response: GenerateResponse = self
            .post(url, &generate_request(prompt))
            .await?
            .json()
            .await?;
        answer_text(response)
    }
}
