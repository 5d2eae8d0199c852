//! OpenAI-compatible chat completions backend.

use super::Reasoner;
use crate::config::{ReasonerConfig, ReasonerProvider};
use crate::protocol;
use async_trait::async_trait;
use quorum_core::{AgentCard, Draft, Message, QuorumError, QuorumResult};

/// OpenAI-compatible API backend.
///
/// Works with OpenAI, OpenRouter, and any other provider that implements
/// the chat completions API.
pub struct OpenAiBackend {
    config: ReasonerConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    /// Creates a backend with a fresh HTTP client.
    pub fn new(config: ReasonerConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_messages(&self, card: &AgentCard, log: &[Message]) -> Vec<serde_json::Value> {
        let mut api_messages = vec![serde_json::json!({
            "role": "system",
            "content": protocol::interaction_protocol(card),
        })];
        for turn in protocol::render_log(card, log) {
            api_messages.push(serde_json::json!({
                "role": if turn.own { "assistant" } else { "user" },
                "content": turn.text,
            }));
        }
        api_messages
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        // OpenRouter asks callers to identify their application
        if matches!(self.config.provider, ReasonerProvider::OpenRouter) {
            request.header("X-Title", "quorum")
        } else {
            request
        }
    }

    async fn post_completions(&self, messages: Vec<serde_json::Value>) -> QuorumResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        let body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": messages,
        });

        let request = self.add_provider_headers(self.http.post(&url));

        let resp = request
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
                "OpenAI API error {status}: {resp_body}"
            )));
        }

        extract_text(&resp_body)
    }
}

#[async_trait]
impl Reasoner for OpenAiBackend {
    async fn invoke(&self, card: &AgentCard, log: &[Message]) -> QuorumResult<Vec<Draft>> {
        let text = self.post_completions(self.build_messages(card, log)).await?;
        protocol::parse_drafts(&text)
    }

    async fn complete(&self, card: &AgentCard, prompt: &str) -> QuorumResult<String> {
        let messages = vec![
            serde_json::json!({"role": "system", "content": card.description}),
            serde_json::json!({"role": "user", "content": prompt}),
        ];
        self.post_completions(messages).await
    }
}

/// Pulls the first choice's message content out of a completions response.
fn extract_text(body: &serde_json::Value) -> QuorumResult<String> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| QuorumError::Http(format!("OpenAI response has no choices: {body}")))
}
