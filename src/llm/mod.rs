pub mod json;
pub mod ollama;

use async_trait::async_trait;

use crate::error::LlmError;

pub use json::coerce_json_object;
pub use ollama::OllamaClient;

/// A single-turn chat with a language model
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one system instruction and one user message, return the assistant text
    async fn chat(&self, system: &str, user: &str, temperature: f32) -> Result<String, LlmError>;

    /// Model name (for logging)
    fn model_name(&self) -> &str;
}

/// First `max_chars` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
