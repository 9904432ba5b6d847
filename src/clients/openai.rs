//! OpenAI-compatible API client
//!
//! Embeddings via POST /v1/embeddings, answers via POST /v1/chat/completions.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::http::{build_client, generation_status_error, generation_transport_error};
use super::{EmbeddingClient, LanguageModelClient};
use crate::errors::{RagError, Result};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// OpenAI client bound to one model
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    /// Requested embedding width; v3 embedding models shorten to it
    dimensions: Option<usize>,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RagError::Config("OpenAI API key is empty".to_string()));
        }

        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature: 0.7,
            dimensions: None,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    fn embedding_request<'a>(&'a self, text: &'a str) -> EmbeddingRequest<'a> {
        EmbeddingRequest {
            model: &self.model,
            input: vec![text],
            dimensions: self.dimensions,
        }
    }

    async fn ping(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let request = self.embedding_request(text);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("HTTP {}: {}", status, error_text)));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to parse embedding: {}", e)))?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| RagError::Embedding("Response contained no embedding".to_string()))?;

        debug!(model = %self.model, dimensions = embedding.len(), "openai embedding");
        Ok(embedding)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.ping().await)
    }
}

#[async_trait]
impl LanguageModelClient for OpenAiClient {
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(generation_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(generation_status_error(status, &error_text));
        }

        let body: ChatResponse = response.json().await.map_err(|e| RagError::Generation {
            message: format!("Failed to parse completion: {}", e),
            retryable: false,
        })?;

        if let Some(usage) = &body.usage {
            debug!(model = %self.model, total_tokens = usage.total_tokens, "openai completion");
        }

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::Generation {
                message: "Completion contained no message".to_string(),
                retryable: true,
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.ping().await)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        let result = OpenAiClient::new(DEFAULT_OPENAI_URL, "  ", DEFAULT_CHAT_MODEL, Duration::from_secs(5));
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn test_embedding_request_carries_dimensions() {
        let client = OpenAiClient::new(DEFAULT_OPENAI_URL, "sk-test", DEFAULT_EMBEDDING_MODEL, Duration::from_secs(5))
            .unwrap();
        let plain = serde_json::to_value(client.embedding_request("sleep")).unwrap();
        assert!(plain.get("dimensions").is_none());

        let sized = client.with_dimensions(768);
        let body = serde_json::to_value(sized.embedding_request("sleep")).unwrap();
        assert_eq!(body["dimensions"], 768);
        assert_eq!(body["model"], DEFAULT_EMBEDDING_MODEL);
        assert_eq!(body["input"][0], "sleep");
    }

    #[test]
    fn test_chat_response_parsing() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Yes [1]."}}],
            "usage": {"total_tokens": 50}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Yes [1]."));
        assert_eq!(parsed.usage.unwrap().total_tokens, 50);
    }

    #[test]
    fn test_embedding_response_parsing() {
        let raw = r#"{"data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data[0].embedding.len(), 3);
    }
}
