//! Agent capability cards.

use crate::message::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An immutable descriptor advertising one registered agent.
///
/// Cards are the currency of planning: the planner matches subtask
/// capability tags against card capabilities when staffing workspaces, and
/// the card's name and role form the agent's `name@role` address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCard {
    /// Unique registered name; the routing key.
    pub name: String,
    /// Role tag; the `role` half of the agent's address.
    pub role: String,
    /// Free-text description shown to the planner and to workspace peers.
    pub description: String,
    /// Capability tags matched against subtask requirements.
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

impl AgentCard {
    /// Creates a card with no capability tags.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            description: description.into(),
            capabilities: BTreeSet::new(),
        }
    }

    /// Adds a single capability tag.
    pub fn with_capability(mut self, tag: impl Into<String>) -> Self {
        self.capabilities.insert(tag.into());
        self
    }

    /// Adds every capability tag from the iterator.
    pub fn with_capabilities<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(tags.into_iter().map(Into::into));
        self
    }

    /// The `name@role` address of this agent.
    pub fn address(&self) -> Address {
        Address::agent(&self.name, &self.role)
    }

    /// True when the card carries the given capability tag.
    ///
    /// Matching is exact and case-sensitive.
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.contains(tag)
    }

    /// Number of tags shared between this card and the given requirement set.
    pub fn overlap(&self, tags: &BTreeSet<String>) -> usize {
        self.capabilities.intersection(tags).count()
    }
}
