use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{chat_messages, send_json, text_at};
use crate::provider::{LlmError, LlmProvider, Message};

pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            model,
        }
    }

    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        json!({
            "model": self.model,
            "messages": chat_messages(messages),
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = self.request_body(&messages, temperature, max_tokens);

        debug!("Ollama request to {} (model {})", url, self.model);

        let resp = send_json(self.client.post(&url), &body).await?;
        text_at(&resp, "/message/content")
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
