use async_trait::async_trait;

use crate::error::RagResult;

/// A chat model that turns one rendered prompt into answer text.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn model(&self) -> &str;

    /// Sends a single user turn, at temperature 0 where the model allows it.
    async fn complete(&self, prompt: &str) -> RagResult<String>;
}
