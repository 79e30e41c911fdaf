pub mod claude;
pub mod ollama;
pub mod openai;

use serde_json::{json, Value};
use sentinel_core::config::{LlmConfig, OllamaConfig};
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message};

/// Create the appropriate LLM provider based on config.
pub fn create_provider(
    llm_config: &LlmConfig,
    ollama_config: &OllamaConfig,
) -> Result<Box<dyn LlmProvider>, LlmError> {
    match llm_config.provider.as_str() {
        "openai" => {
            let api_key = llm_config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            let base_url = llm_config
                .openai_base_url
                .as_deref()
                .unwrap_or("https://api.openai.com");
            Ok(Box::new(openai::OpenAiProvider::new(
                api_key.clone(),
                llm_config.openai_model.clone(),
                base_url.to_string(),
            )))
        }
        "anthropic" | "claude" => {
            let api_key = llm_config
                .anthropic_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".into()))?;
            Ok(Box::new(claude::ClaudeProvider::new(
                api_key.clone(),
                llm_config.anthropic_model.clone(),
            )))
        }
        "ollama" => Ok(Box::new(ollama::OllamaProvider::new(
            ollama_config.url.clone(),
            ollama_config.model.clone(),
        ))),
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}

/// OpenAI-style `{role, content}` message objects.
pub(crate) fn chat_messages<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Vec<Value> {
    messages
        .into_iter()
        .map(|m| {
            json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        })
        .collect()
}

/// Send a JSON request and return the decoded body, mapping non-200
/// statuses to [`LlmError::ApiError`].
pub(crate) async fn send_json(request: reqwest::RequestBuilder, body: &Value) -> Result<Value, LlmError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await?;

    let status = response.status().as_u16();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        debug!(status, "LLM backend returned an error status");
        return Err(LlmError::ApiError { status, body });
    }

    Ok(response.json().await?)
}

/// Pull a string out of a response by JSON pointer.
pub(crate) fn text_at(resp: &Value, pointer: &str) -> Result<String, LlmError> {
    resp.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LlmError::ParseError(format!("missing {pointer}")))
}

#[cfg(test)]
mod tests {
    use sentinel_core::config::{LlmConfig, OllamaConfig};

    use super::*;

    fn llm_config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.into(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".into(),
            openai_base_url: None,
            anthropic_api_key: None,
            anthropic_model: "claude".into(),
            temperature: 0.0,
            max_tokens: 64,
        }
    }

    fn ollama_config() -> OllamaConfig {
        OllamaConfig {
            url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
        }
    }

    #[test]
    fn missing_api_key_is_not_configured() {
        let err = create_provider(&llm_config("openai"), &ollama_config()).err().unwrap();
        assert!(matches!(err, LlmError::NotConfigured(_)));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = create_provider(&llm_config("mystery"), &ollama_config()).err().unwrap();
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn providers_are_built_by_name() {
        let ollama = create_provider(&llm_config("ollama"), &ollama_config()).unwrap();
        assert_eq!(ollama.name(), "ollama");

        let mut cfg = llm_config("anthropic");
        cfg.anthropic_api_key = Some("sk-test".into());
        let claude = create_provider(&cfg, &ollama_config()).unwrap();
        assert_eq!(claude.name(), "anthropic");

        let mut cfg = llm_config("openai");
        cfg.openai_api_key = Some("sk-test".into());
        let openai = create_provider(&cfg, &ollama_config()).unwrap();
        assert_eq!(openai.name(), "openai");
    }

    #[test]
    fn chat_messages_use_lowercase_roles() {
        let msgs = vec![Message::system("be brief"), Message::user("why?")];
        let json = chat_messages(&msgs);
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[1]["role"], "user");
        assert_eq!(json[1]["content"], "why?");
    }

    #[test]
    fn text_at_reports_missing_path() {
        let resp = json!({"choices": []});
        let err = text_at(&resp, "/choices/0/message/content").unwrap_err();
        assert!(err.to_string().contains("/choices/0/message/content"));
    }
}
