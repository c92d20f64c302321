use crate::core::error::AibudError;
use async_trait::async_trait;

/// One free-form completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub engine: String,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Raw generated text, untrimmed.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AibudError>;
}

pub mod base_client;
pub mod factory;
pub mod openai;
