//! OpenAI API client (embeddings + chat completions).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderSettings;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, RagResult};
use crate::llm::ChatProvider;

use super::check_status;

pub struct OpenAiClient {
    client: Client,
    settings: ProviderSettings,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

/// Vectors in request order; the API tags each with its input index.
fn ordered_vectors(response: EmbeddingsResponse) -> Vec<Vec<f32>> {
    let mut data = response.data;
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

/// Reasoning models (`o*`, `gpt-5*` other than the `-chat` variants) reject
/// any temperature but the default.
fn accepts_temperature(model: &str) -> bool {
    let reasoning = model.starts_with('o')
        || (model.starts_with("gpt-5") && !model.contains("-chat"));
    !reasoning
}

fn chat_request<'a>(model: &'a str, prompt: &str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![Message {
            role: "user".to_string(),
            content: Some(prompt.to_string()),
        }],
        temperature: accepts_temperature(model).then_some(0.0),
    }
}

fn answer_text(response: ChatResponse) -> RagResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| RagError::UpstreamProvider("openai returned no choices".to_string()))
}

impl OpenAiClient {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> RagResult<reqwest::Response> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.settings.api_key)
            .json(body)
            .send()
            .await?;
        check_status("openai", response).await
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    fn identity(&self) -> String {
        format!("openai:{}", self.settings.models.embedding)
    }

    async fn embed_documents(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingsRequest {
            model: &self.settings.models.embedding,
            input: texts,
        };
        debug!("openai embed of {} texts", texts.len());

        let response: EmbeddingsResponse = self.post("embeddings", &request).await?.json().await?;
        Ok(ordered_vectors(response))
    }

    async fn embed_query(&self, text: &str) -> RagResult<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::UpstreamProvider("openai returned no embedding".to_string()))
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    fn model(&self) -> &str {
        &self.settings.models.chat
    }

    async fn complete(&self, prompt: &str) -> RagResult<String> {
        let request = chat_request(&self.settings.models.chat, prompt);
        let response: ChatResponse = self
            .post("chat/completions", &request)
            .await?
            .json()
            .await?;
        answer_text(response)
    }
}
