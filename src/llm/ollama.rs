use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::OllamaConfig;
use crate::error::LlmError;
use crate::llm::ChatModel;

/// Ollama chat request (non-streaming)
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    pub content: String,
}

impl OllamaMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Only the fields this crate reads from `/api/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatResponse {
    pub model: String,
    pub message: OllamaMessage,
    #[serde(default)]
    pub done: bool,
}

/// Ollama local LLM client
pub struct OllamaClient {
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Result<Self, LlmError> {
        info!("Using Ollama model '{}' at {}", config.model, config.base_url);

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Network { source: e })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            http_client,
        })
    }

    pub fn build_request(&self, system: &str, user: &str, temperature: f32) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![OllamaMessage::system(system), OllamaMessage::user(user)],
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(temperature),
            }),
        }
    }

    /// POST to the Ollama /api/chat endpoint
    pub async fn create_chat(&self, request: &OllamaChatRequest) -> Result<OllamaChatResponse, LlmError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!("Sending chat request to {} ({} message(s))", url, request.messages.len());

        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::api_error(status.as_u16(), error_text));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::invalid_response(format!("Failed to parse response: {}", e)))?;

        debug!(
            "Chat response from '{}' ({} chars, done={})",
            chat_response.model,
            chat_response.message.content.len(),
            chat_response.done
        );

        Ok(chat_response)
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn chat(&self, system: &str, user: &str, temperature: f32) -> Result<String, LlmError> {
        let request = self.build_request(system, user, temperature);
        let response = self.create_chat(&request).await?;
        Ok(response.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
