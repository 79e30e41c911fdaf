use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{chat_messages, send_json, text_at};
use crate::provider::{LlmError, LlmProvider, Message, Role};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Claude takes the system prompt as a top-level field, not a message.
    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": chat_messages(messages.iter().filter(|m| m.role != Role::System)),
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }
        body
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let body = self.request_body(&messages, temperature, max_tokens);

        debug!("Claude request to {} (model {})", MESSAGES_URL, self.model);

        let request = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let resp = send_json(request, &body).await?;
        text_at(&resp, "/content/0/text")
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_moves_to_top_level() {
        let provider = ClaudeProvider::new("k".into(), "claude".into());
        let body = provider.request_body(
            &[Message::system("You are terse."), Message::user("explain")],
            0.0,
            100,
        );
        assert_eq!(body["system"], "You are terse.");
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["role"], "user");
    }

    #[test]
    fn no_system_field_without_system_messages() {
        let provider = ClaudeProvider::new("k".into(), "claude".into());
        let body = provider.request_body(&[Message::user("explain")], 0.0, 100);
        assert!(body.get("system").is_none());
    }
}
