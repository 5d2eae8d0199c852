//! Transient-failure retries around a reasoning backend.
//!
//! Retrying lives strictly at the backend boundary. The engine never
//! retries: a reasoning error that reaches it fails the workspace, so any
//! retry budget has to be spent before the error crosses this layer.

use crate::backends::Reasoner;
use async_trait::async_trait;
use quorum_core::{AgentCard, Draft, Message, QuorumError, QuorumResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Type alias for the injectable sleep function used in tests.
#[cfg(test)]
type SleepFn = Box<
    dyn Fn(u64) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> + Send + Sync,
>;

/// Configures retry behaviour for transient backend failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Maximum delay in milliseconds (backoff cap).
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

/// Determines whether an error is transient and worth retrying.
///
/// Only transport-level failures qualify: rate limits (429), timeouts, and
/// server errors (5xx). Reasoning errors are never retryable; the contract
/// requires them to reach the engine intact.
pub fn is_retryable(err: &QuorumError) -> bool {
    let QuorumError::Http(msg) = err else {
        return false;
    };
    let lower = msg.to_lowercase();
    lower.contains("429")
        || lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("500")
        || lower.contains("502")
        || lower.contains("503")
        || lower.contains("504")
}

/// Computes the delay for a given attempt, exponential and capped.
fn compute_backoff(policy: &RetryPolicy, attempt: u32) -> u64 {
    let delay = policy
        .backoff_base_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    delay.min(policy.backoff_max_ms)
}

/// A [`Reasoner`] that retries transient failures of an inner backend.
pub struct RetryBackend {
    inner: Box<dyn Reasoner>,
    policy: RetryPolicy,
    /// Injectable sleep function so tests can skip real delays.
    #[cfg(test)]
    sleep_fn: Option<SleepFn>,
}

impl RetryBackend {
    /// Wraps a backend with the given retry policy.
    pub fn new(inner: Box<dyn Reasoner>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            #[cfg(test)]
            sleep_fn: None,
        }
    }

    async fn do_sleep(&self, ms: u64) {
        #[cfg(test)]
        if let Some(sleep) = &self.sleep_fn {
            sleep(ms).await;
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl Reasoner for RetryBackend {
    async fn invoke(&self, card: &AgentCard, log: &[Message]) -> QuorumResult<Vec<Draft>> {
        let mut attempt = 0;
        loop {
            match self.inner.invoke(card, log).await {
                Ok(drafts) => return Ok(drafts),
                Err(err) if is_retryable(&err) && attempt < self.policy.max_retries => {
                    let delay = compute_backoff(&self.policy, attempt);
                    warn!(
                        agent = %card.name,
                        attempt,
                        delay_ms = delay,
                        error = %err,
                        "transient backend failure, retrying"
                    );
                    self.do_sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn complete(&self, card: &AgentCard, prompt: &str) -> QuorumResult<String> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(card, prompt).await {
                Ok(text) => return Ok(text),
                Err(err) if is_retryable(&err) && attempt < self.policy.max_retries => {
                    let delay = compute_backoff(&self.policy, attempt);
                    warn!(
                        agent = %card.name,
                        attempt,
                        delay_ms = delay,
                        error = %err,
                        "transient backend failure, retrying"
                    );
                    self.do_sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
