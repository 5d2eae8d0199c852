//! Provider dispatch.

use crate::backends::claude::ClaudeBackend;
use crate::backends::openai::OpenAiBackend;
use crate::backends::Reasoner;
use crate::config::{ReasonerConfig, ReasonerProvider};
use crate::retry::RetryBackend;
use async_trait::async_trait;
use quorum_core::{AgentCard, Draft, Message, QuorumResult};

/// Reasoner handle that dispatches to the configured provider backend.
///
/// Uses the [`Reasoner`] trait to hide provider-specific API differences.
/// To add a new provider: implement `Reasoner` in `backends/` and wire it
/// here.
pub struct ReasonerClient {
    backend: Box<dyn Reasoner>,
}

impl ReasonerClient {
    /// Builds the backend named by the config.
    ///
    /// When the config carries a retry policy, the backend is wrapped so
    /// transient transport failures are retried before they reach the
    /// engine.
    pub fn new(config: ReasonerConfig) -> Self {
        let retry_policy = config.retry_policy.clone();
        let backend: Box<dyn Reasoner> = match config.provider {
            ReasonerProvider::Claude => Box::new(ClaudeBackend::new(config)),
            ReasonerProvider::OpenAi | ReasonerProvider::OpenRouter => {
                Box::new(OpenAiBackend::new(config))
            }
        };
        match retry_policy {
            Some(policy) => Self {
                backend: Box::new(RetryBackend::new(backend, policy)),
            },
            None => Self { backend },
        }
    }

    /// Creates a client from a pre-built backend (custom or scripted).
    pub fn from_backend(backend: Box<dyn Reasoner>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Reasoner for ReasonerClient {
    async fn invoke(&self, card: &AgentCard, log: &[Message]) -> QuorumResult<Vec<Draft>> {
        self.backend.invoke(card, log).await
    }

    async fn complete(&self, card: &AgentCard, prompt: &str) -> QuorumResult<String> {
        self.backend.complete(card, prompt).await
    }
}
