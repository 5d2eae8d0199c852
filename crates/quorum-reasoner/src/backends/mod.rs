//! Reasoning backends.

/// Anthropic Messages API backend.
pub mod claude;
/// OpenAI-compatible chat completions backend.
pub mod openai;
/// Deterministic queue-driven backend for tests and offline runs.
pub mod scripted;

use async_trait::async_trait;
use quorum_core::{AgentCard, Draft, Message, QuorumResult};

/// Trait for reasoning backends.
///
/// A backend turns one member's view of a workspace into that member's next
/// addressed drafts. Each provider (Claude, OpenAI-compatible, scripted)
/// implements this trait to hide API differences from the engine.
///
/// To add a new provider:
/// 1. Create a new module in `backends/`
/// 2. Implement `Reasoner` for your struct
/// 3. Add the variant to `ReasonerProvider` in `config.rs`
/// 4. Wire it up in `ReasonerClient::new()` in `client.rs`
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Produces the invoked member's next drafts.
    ///
    /// `card` identifies the member taking the turn and `log` is the full
    /// ordered log visible to it. An empty vec is a normal silent turn.
    /// Failures surface as [`quorum_core::QuorumError::Reasoning`] and the
    /// engine treats them as fatal for the invoking workspace; backends
    /// must not hide them behind empty output.
    async fn invoke(&self, card: &AgentCard, log: &[Message]) -> QuorumResult<Vec<Draft>>;

    /// Produces a raw text document for a one-shot prompt.
    ///
    /// The planner uses this to obtain decomposition proposals, which are
    /// documents rather than addressed messages and skip the reply
    /// protocol entirely.
    async fn complete(&self, card: &AgentCard, prompt: &str) -> QuorumResult<String>;
}
