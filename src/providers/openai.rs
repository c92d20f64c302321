use super::{CompletionProvider, CompletionRequest};
use crate::core::error::AibudError;
use crate::providers::base_client::HttpClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize)]
struct CompletionPayload<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    text: String,
}

/// Client for the OpenAI-style `POST /completions` endpoint. GooseAI and other
/// compatible hosts use the same wire format.
#[derive(Clone)]
pub struct OpenAICompletionProvider {
    name: String,
    client: HttpClient,
}

impl OpenAICompletionProvider {
    pub fn new(
        name: &str,
        endpoint: String,
        api_key: Option<String>,
        extra_headers: Option<HashMap<String, String>>,
    ) -> Self {
        let api_key = api_key.unwrap_or_default();
        Self {
            name: name.to_string(),
            client: HttpClient::new(endpoint, api_key, extra_headers),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompletionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, AibudError> {
        let payload = CompletionPayload {
            model: &request.engine,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
        };

        let response = self.client.post("completions", &payload).await?;
        let response_body: String = response.text().await?;
        let parsed: CompletionResponse = serde_json::from_str(&response_body)?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| AibudError::Api("No choices in API response".to_string()))
    }
}
