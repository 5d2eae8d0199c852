//! Process-wide agent registration.

use crate::card::AgentCard;
use crate::error::{QuorumError, QuorumResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Process-wide directory of registered agents.
///
/// Registration is a setup phase that completes before any task is
/// submitted. The engine only ever reads [`RegistrySnapshot`]s, so cards
/// registered mid-run become visible to later runs only.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    cards: RwLock<BTreeMap<String, Arc<AgentCard>>>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a card under its name.
    ///
    /// Names are unique; re-registering an existing name is rejected so a
    /// card can never change underneath a running plan.
    pub fn register(&self, card: AgentCard) -> QuorumResult<()> {
        if card.name.trim().is_empty() {
            return Err(QuorumError::Config("agent name must be non-empty".into()));
        }
        let mut cards = self.cards.write();
        if cards.contains_key(&card.name) {
            return Err(QuorumError::Config(format!(
                "agent `{}` is already registered",
                card.name
            )));
        }
        cards.insert(card.name.clone(), Arc::new(card));
        Ok(())
    }

    /// Looks up a card by registered name.
    pub fn get(&self, name: &str) -> Option<Arc<AgentCard>> {
        self.cards.read().get(name).cloned()
    }

    /// True when a card with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.cards.read().contains_key(name)
    }

    /// Number of registered cards.
    pub fn len(&self) -> usize {
        self.cards.read().len()
    }

    /// True when no cards are registered.
    pub fn is_empty(&self) -> bool {
        self.cards.read().is_empty()
    }

    /// Takes an immutable copy of the current registrations.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            cards: self.cards.read().clone(),
        }
    }
}

/// An immutable copy of the registry taken when a run starts.
///
/// Planner and workspace manager consume snapshots exclusively, which
/// pins the agent population for the lifetime of one run.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    cards: BTreeMap<String, Arc<AgentCard>>,
}

impl RegistrySnapshot {
    /// Looks up a card by registered name.
    pub fn get(&self, name: &str) -> Option<&Arc<AgentCard>> {
        self.cards.get(name)
    }

    /// True when a card with this name is in the snapshot.
    pub fn contains(&self, name: &str) -> bool {
        self.cards.contains_key(name)
    }

    /// Iterates cards in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AgentCard>> {
        self.cards.values()
    }

    /// Number of cards in the snapshot.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True when the snapshot holds no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards whose capability set intersects the given tags.
    ///
    /// Sorted by overlap (largest first), ties broken by name, so staffing
    /// repair is deterministic.
    pub fn eligible_for(&self, tags: &BTreeSet<String>) -> Vec<Arc<AgentCard>> {
        let mut matches: Vec<Arc<AgentCard>> = self
            .cards
            .values()
            .filter(|card| card.overlap(tags) > 0)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.overlap(tags)
                .cmp(&a.overlap(tags))
                .then_with(|| a.name.cmp(&b.name))
        });
        matches
    }
}
