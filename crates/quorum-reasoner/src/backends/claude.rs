//! Anthropic Messages API backend.

use super::Reasoner;
use crate::config::ReasonerConfig;
use crate::protocol;
use async_trait::async_trait;
use quorum_core::{AgentCard, Draft, Message, QuorumError, QuorumResult};
use serde::Serialize;

/// Claude (Anthropic) API backend.
pub struct ClaudeBackend {
    config: ReasonerConfig,
    http: reqwest::Client,
}

impl ClaudeBackend {
    /// Creates a backend with a fresh HTTP client.
    pub fn new(config: ReasonerConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn post_messages(
        &self,
        system: &str,
        messages: Vec<ClaudeMessage>,
    ) -> QuorumResult<String> {
        let url = format!("{}/v1/messages", self.config.base_url());

        let body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": system,
            "messages": messages,
        });

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| QuorumError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| QuorumError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(QuorumError::Http(format!(
                "Claude API error {status}: {resp_body}"
            )));
        }

        extract_text(&resp_body)
    }
}

#[derive(Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: String,
}

#[async_trait]
impl Reasoner for ClaudeBackend {
    async fn invoke(&self, card: &AgentCard, log: &[Message]) -> QuorumResult<Vec<Draft>> {
        let api_messages: Vec<ClaudeMessage> = protocol::render_log(card, log)
            .into_iter()
            .map(|turn| ClaudeMessage {
                role: if turn.own { "assistant" } else { "user" },
                content: turn.text,
            })
            .collect();

        let text = self
            .post_messages(&protocol::interaction_protocol(card), api_messages)
            .await?;
        protocol::parse_drafts(&text)
    }

    async fn complete(&self, card: &AgentCard, prompt: &str) -> QuorumResult<String> {
        let messages = vec![ClaudeMessage {
            role: "user",
            content: prompt.to_string(),
        }];
        self.post_messages(&card.description, messages).await
    }
}

/// Concatenates the text blocks of a Messages API response.
fn extract_text(body: &serde_json::Value) -> QuorumResult<String> {
    let blocks = body
        .get("content")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| QuorumError::Http(format!("Claude response has no content: {body}")))?;

    let mut text = String::new();
    for block in blocks {
        if block.get("type").and_then(serde_json::Value::as_str) == Some("text") {
            if let Some(chunk) = block.get("text").and_then(serde_json::Value::as_str) {
                text.push_str(chunk);
            }
        }
    }
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_concatenates_text_blocks() {
        let body = serde_json::json!({
            "content": [
                {"type": "text", "text": "{\"to\": \"USER\", "},
                {"type": "tool_use", "id": "x", "name": "y", "input": {}},
                {"type": "text", "text": "\"content\": \"done\"}"},
            ]
        });
        let text = extract_text(&body).unwrap();
        assert_eq!(text, "{\"to\": \"USER\", \"content\": \"done\"}");
    }

    #[test]
    fn extract_text_rejects_missing_content() {
        let body = serde_json::json!({"error": {"message": "overloaded"}});
        assert!(matches!(
            extract_text(&body),
            Err(QuorumError::Http(_))
        ));
    }
}
