//! Deterministic queue-driven backend.

use super::Reasoner;
use async_trait::async_trait;
use parking_lot::Mutex;
use quorum_core::{AgentCard, Draft, Message, QuorumError, QuorumResult};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
enum Step {
    Drafts(Vec<Draft>),
    Failure(String),
}

/// Deterministic backend replaying canned turns per agent name.
///
/// Each invocation pops the next step from the named agent's queue; an
/// exhausted queue yields the silent turn. One-shot completions replay
/// from a separate queue and error when it runs dry, since a planner with
/// nothing to say is a failure rather than silence. Invocation counts are
/// recorded so tests can assert how often each member was consulted.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    completions: Mutex<HashMap<String, VecDeque<String>>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedBackend {
    /// Creates an empty backend; every agent starts silent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a drafts turn for the named agent.
    pub fn push_drafts(&self, agent: &str, drafts: Vec<Draft>) {
        self.scripts
            .lock()
            .entry(agent.to_string())
            .or_default()
            .push_back(Step::Drafts(drafts));
    }

    /// Queues a reasoning failure for the named agent.
    pub fn push_failure(&self, agent: &str, detail: &str) {
        self.scripts
            .lock()
            .entry(agent.to_string())
            .or_default()
            .push_back(Step::Failure(detail.to_string()));
    }

    /// Queues a one-shot completion document for the named agent.
    pub fn push_completion(&self, agent: &str, text: &str) {
        self.completions
            .lock()
            .entry(agent.to_string())
            .or_default()
            .push_back(text.to_string());
    }

    /// Number of times the named agent has been invoked so far.
    pub fn invocations(&self, agent: &str) -> u32 {
        self.calls.lock().get(agent).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Reasoner for ScriptedBackend {
    async fn invoke(&self, card: &AgentCard, _log: &[Message]) -> QuorumResult<Vec<Draft>> {
        *self.calls.lock().entry(card.name.clone()).or_insert(0) += 1;

        let step = self
            .scripts
            .lock()
            .get_mut(&card.name)
            .and_then(VecDeque::pop_front);

        match step {
            Some(Step::Drafts(drafts)) => Ok(drafts),
            Some(Step::Failure(detail)) => Err(QuorumError::Reasoning(detail)),
            None => Ok(Vec::new()),
        }
    }

    async fn complete(&self, card: &AgentCard, _prompt: &str) -> QuorumResult<String> {
        *self.calls.lock().entry(card.name.clone()).or_insert(0) += 1;

        self.completions
            .lock()
            .get_mut(&card.name)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| {
                QuorumError::Reasoning(format!("no scripted completion left for `{}`", card.name))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_steps_in_order_then_goes_silent() {
        let backend = ScriptedBackend::new();
        backend.push_drafts("scout", vec![Draft::to_user("first")]);
        backend.push_failure("scout", "model offline");

        let card = AgentCard::new("scout", "surveyor", "");

        let drafts = backend.invoke(&card, &[]).await.unwrap();
        assert_eq!(drafts[0].content, "first");

        let err = backend.invoke(&card, &[]).await.unwrap_err();
        assert!(matches!(err, QuorumError::Reasoning(_)));

        assert!(backend.invoke(&card, &[]).await.unwrap().is_empty());
        assert_eq!(backend.invocations("scout"), 3);
    }

    #[tokio::test]
    async fn unknown_agents_are_silent() {
        let backend = ScriptedBackend::new();
        let card = AgentCard::new("ghost", "nobody", "");
        assert!(backend.invoke(&card, &[]).await.unwrap().is_empty());
        assert_eq!(backend.invocations("ghost"), 1);
        assert_eq!(backend.invocations("never-called"), 0);
    }

    #[tokio::test]
    async fn completions_replay_then_error() {
        let backend = ScriptedBackend::new();
        backend.push_completion("planner", "{\"subtasks\": []}");

        let card = AgentCard::new("planner", "planner", "");

        let text = backend.complete(&card, "split this").await.unwrap();
        assert_eq!(text, "{\"subtasks\": []}");

        let err = backend.complete(&card, "again").await.unwrap_err();
        assert!(matches!(err, QuorumError::Reasoning(_)));
    }
}
