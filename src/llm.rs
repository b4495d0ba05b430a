//! Generative model client boundary.
//!
//! [`GenerativeClient::complete_json`] sends a system instruction, a user
//! prompt, and a strict JSON schema the provider is expected to honor, and
//! returns the raw JSON string. The client never validates the payload
//! shape: providers can return structurally valid but incomplete JSON, so
//! validation and repair belong to the generation orchestrator.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::OpenAiConfig;
use crate::error::{AdvisorError, Result};

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Returns the provider's JSON content string.
    ///
    /// Fails with `UpstreamUnavailable` when the provider is unreachable or
    /// rejects the request, and `MalformedResponse` when the completion
    /// carries no content at all.
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &serde_json::Value,
        model: Option<&str>,
    ) -> Result<String>;
}

/// Chat-completions client using OpenAI structured outputs
/// (`response_format = json_schema`).
pub struct OpenAiChatClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    /// Reads `OPENAI_API_KEY` from the environment.
    pub fn new(config: &OpenAiConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            model: config.chat_model.clone(),
        })
    }
}

#[async_trait]
impl GenerativeClient for OpenAiChatClient {
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &serde_json::Value,
        model: Option<&str>,
    ) -> Result<String> {
        if system_prompt.trim().is_empty() || user_prompt.trim().is_empty() {
            return Err(AdvisorError::InvalidInput(
                "system and user prompts must be non-empty".to_string(),
            ));
        }

        let model = model.unwrap_or(&self.model);
        let body = serde_json::json!({
            "model": model,
            "temperature": 0.2,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "advisor_response",
                    "schema": schema,
                }
            },
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });

        let response = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisorError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(AdvisorError::UpstreamUnavailable(format!(
                "chat completions API returned {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdvisorError::MalformedResponse(e.to_string()))?;

        extract_content(&json)
    }
}

/// Pull `choices[0].message.content` out of the completion envelope.
fn extract_content(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            AdvisorError::MalformedResponse("chat completion contained no content".into())
        })?;

    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "{\"summary\":\"ok\"}"}}]
        });
        assert_eq!(extract_content(&json).unwrap(), "{\"summary\":\"ok\"}");
    }

    #[test]
    fn test_extract_content_missing_is_malformed() {
        let json = serde_json::json!({"choices": [{"message": {}}]});
        let err = extract_content(&json).unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[test]
    fn test_extract_content_empty_string_is_malformed() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "   "}}]
        });
        assert!(extract_content(&json).is_err());
    }
}
