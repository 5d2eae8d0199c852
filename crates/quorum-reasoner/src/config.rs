//! Provider selection and connection settings.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Which hosted API a reasoning backend speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonerProvider {
    /// Anthropic Messages API.
    Claude,
    /// OpenAI chat completions API.
    OpenAi,
    /// OpenRouter aggregation, speaking the OpenAI-compatible API.
    OpenRouter,
}

/// Connection settings for one hosted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonerConfig {
    /// The provider to dispatch to.
    pub provider: ReasonerProvider,
    /// Provider-side model identifier.
    pub model_id: String,
    /// API credential, passed through verbatim and never persisted.
    pub api_key: String,
    /// Endpoint override; tests point this at a local mock server.
    pub api_base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on tokens generated per invocation.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Optional transient-failure retry policy applied around the backend.
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

impl ReasonerConfig {
    /// Creates a config with default sampling settings and no retry.
    pub fn new(provider: ReasonerProvider, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            api_key: String::new(),
            api_base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            retry_policy: None,
        }
    }

    /// Sets the API credential.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Overrides the endpoint root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Wraps the backend in a [`RetryPolicy`] for transient failures.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Endpoint root, honouring the override.
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url
        } else {
            match self.provider {
                ReasonerProvider::Claude => "https://api.anthropic.com",
                ReasonerProvider::OpenAi => "https://api.openai.com",
                ReasonerProvider::OpenRouter => "https://openrouter.ai/api",
            }
        }
    }
}
