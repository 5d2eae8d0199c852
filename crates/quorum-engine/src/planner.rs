//! Reasoner-driven decomposition of tasks into staffed trees.
//!
//! Planning trusts the reasoner for the shape of the split but never for
//! staffing. Proposed agents are checked against the registry snapshot,
//! understaffed areas are topped up from capability-eligible substitutes,
//! and an area that still cannot seat two agents fails the whole plan.

use crate::tree::{StaffedSubtask, TaskTree};
use quorum_core::{AgentCard, DecompositionReason, QuorumError, QuorumResult, RegistrySnapshot};
use quorum_reasoner::protocol::{self, Proposal, PLANNER_NAME};
use quorum_reasoner::Reasoner;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Turns one task description into a validated, staffed task tree.
pub struct TaskPlanner {
    reasoner: Arc<dyn Reasoner>,
}

impl TaskPlanner {
    /// Creates a planner over the given reasoning backend.
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    /// Plans a single level: the task becomes a root with staffed children.
    pub async fn plan(&self, task: &str, snapshot: &RegistrySnapshot) -> QuorumResult<TaskTree> {
        if snapshot.is_empty() {
            return Err(QuorumError::decomposition(
                DecompositionReason::NoAgentsAvailable,
                "the agent registry is empty",
            ));
        }
        info!(task = %task, agents = snapshot.len(), "planning decomposition");

        let proposal = self.propose(task, snapshot).await?;
        let subtasks = staff(proposal, snapshot)?;
        let tree = TaskTree::new(task, subtasks)?;
        info!(subtasks = tree.subtasks().count(), "decomposition planned");
        Ok(tree)
    }

    /// Plans recursively up to `max_depth` levels of subtasks.
    ///
    /// Each round replans every current leaf subtask and grafts the
    /// resulting areas under it. A failure at any level fails the whole
    /// plan; partial trees are never returned.
    pub async fn plan_nested(
        &self,
        task: &str,
        snapshot: &RegistrySnapshot,
        max_depth: u32,
    ) -> QuorumResult<TaskTree> {
        let mut tree = self.plan(task, snapshot).await?;
        let mut depth = 1;
        while depth < max_depth {
            let leaves: Vec<(Uuid, String)> = tree
                .subtasks()
                .filter(|node| node.children.is_empty())
                .map(|node| (node.id, node.description.clone()))
                .collect();
            for (leaf_id, description) in leaves {
                debug!(subtask = %description, depth, "expanding leaf subtask");
                let donor = self.plan(&description, snapshot).await?;
                tree = tree.graft(leaf_id, donor)?;
            }
            depth += 1;
        }
        Ok(tree)
    }

    async fn propose(&self, task: &str, snapshot: &RegistrySnapshot) -> QuorumResult<Proposal> {
        let prompt = protocol::planner_instructions(task, snapshot);
        let card = AgentCard::new(
            PLANNER_NAME,
            "planner",
            "Decomposes tasks into parallel subtask areas and staffs them from a roster.",
        );
        let raw = self
            .reasoner
            .complete(&card, &prompt)
            .await
            .map_err(|err| match err {
                QuorumError::Reasoning(detail) => QuorumError::decomposition(
                    DecompositionReason::MalformedProposal,
                    format!("planning produced no usable document: {detail}"),
                ),
                other => other,
            })?;
        protocol::parse_proposal(&raw)
    }
}

/// Validates and repairs the staffing of a proposal.
fn staff(proposal: Proposal, snapshot: &RegistrySnapshot) -> QuorumResult<Vec<StaffedSubtask>> {
    let mut staffed = Vec::with_capacity(proposal.subtasks.len());
    for subtask in proposal.subtasks {
        let tags: BTreeSet<String> = subtask.capabilities.iter().cloned().collect();

        let mut agents = BTreeSet::new();
        for name in &subtask.agents {
            match snapshot.get(name) {
                Some(card) if tags.is_empty() || card.overlap(&tags) > 0 => {
                    agents.insert(name.clone());
                }
                Some(_) => warn!(
                    subtask = %subtask.description,
                    agent = %name,
                    "proposed agent lacks the required capabilities, dropping"
                ),
                None => warn!(
                    subtask = %subtask.description,
                    agent = %name,
                    "proposal names an unregistered agent, dropping"
                ),
            }
        }

        // Staffing repair: seat eligible substitutes, best overlap first.
        if agents.len() < 2 {
            for card in snapshot.eligible_for(&tags) {
                if agents.len() >= 2 {
                    break;
                }
                if agents.insert(card.name.clone()) {
                    debug!(
                        subtask = %subtask.description,
                        agent = %card.name,
                        "seated substitute agent"
                    );
                }
            }
        }

        if agents.len() < 2 {
            return Err(QuorumError::decomposition(
                DecompositionReason::CapabilityMismatch,
                format!(
                    "subtask `{}` has {} eligible agent(s), needs at least 2",
                    subtask.description,
                    agents.len()
                ),
            ));
        }
        staffed.push(StaffedSubtask {
            description: subtask.description,
            agents,
        });
    }
    Ok(staffed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use quorum_core::AgentRegistry;
    use quorum_reasoner::ScriptedBackend;

    fn gala_registry() -> AgentRegistry {
        let registry = AgentRegistry::new();
        registry
            .register(AgentCard::new("scout", "surveyor", "finds venues").with_capability("venue"))
            .unwrap();
        registry
            .register(AgentCard::new("vera", "inspector", "checks venues").with_capability("venue"))
            .unwrap();
        registry
            .register(AgentCard::new("chef", "caterer", "plans menus").with_capability("catering"))
            .unwrap();
        registry
            .register(
                AgentCard::new("nina", "sommelier", "pairs wine").with_capability("catering"),
            )
            .unwrap();
        registry
    }

    fn planner_with(proposal: &str) -> (TaskPlanner, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_completion(PLANNER_NAME, proposal);
        (
            TaskPlanner::new(Arc::clone(&backend) as Arc<dyn Reasoner>),
            backend,
        )
    }

    #[tokio::test]
    async fn empty_registry_fails_before_any_reasoning() {
        let backend = Arc::new(ScriptedBackend::new());
        let planner = TaskPlanner::new(Arc::clone(&backend) as Arc<dyn Reasoner>);
        let registry = AgentRegistry::new();

        let err = planner
            .plan("plan the gala", &registry.snapshot())
            .await
            .unwrap_err();
        assert!(err.is_decomposition(DecompositionReason::NoAgentsAvailable));
        assert_eq!(backend.invocations(PLANNER_NAME), 0);
    }

    #[tokio::test]
    async fn valid_proposals_become_staffed_trees() {
        let (planner, _) = planner_with(
            r#"{"subtasks": [
                {"description": "book the venue", "capabilities": ["venue"], "agents": ["scout", "vera"]},
                {"description": "arrange catering", "capabilities": ["catering"], "agents": ["chef", "nina"]}
            ]}"#,
        );

        let tree = planner
            .plan("plan the gala", &gala_registry().snapshot())
            .await
            .unwrap();

        assert_eq!(tree.subtasks().count(), 2);
        let venue = &tree.root.children[0];
        assert_eq!(venue.description, "book the venue");
        assert!(venue.assigned.contains("scout"));
        assert!(venue.assigned.contains("vera"));
    }

    #[tokio::test]
    async fn unknown_agents_are_replaced_by_eligible_substitutes() {
        let (planner, _) = planner_with(
            r#"{"subtasks": [
                {"description": "book the venue", "capabilities": ["venue"], "agents": ["scout", "imposter"]}
            ]}"#,
        );

        let tree = planner
            .plan("book it", &gala_registry().snapshot())
            .await
            .unwrap();

        let venue = &tree.root.children[0];
        assert!(!venue.assigned.contains("imposter"));
        assert_eq!(
            venue.assigned,
            BTreeSet::from(["scout".to_string(), "vera".to_string()])
        );
    }

    #[tokio::test]
    async fn capability_mismatched_agents_are_dropped_not_seated() {
        // chef is registered but has no venue capability.
        let (planner, _) = planner_with(
            r#"{"subtasks": [
                {"description": "book the venue", "capabilities": ["venue"], "agents": ["chef", "scout"]}
            ]}"#,
        );

        let tree = planner
            .plan("book it", &gala_registry().snapshot())
            .await
            .unwrap();

        let venue = &tree.root.children[0];
        assert!(!venue.assigned.contains("chef"));
        assert!(venue.assigned.contains("vera"));
    }

    #[tokio::test]
    async fn unstaffable_subtasks_fail_the_whole_plan() {
        let registry = AgentRegistry::new();
        registry
            .register(AgentCard::new("scout", "surveyor", "finds venues").with_capability("venue"))
            .unwrap();
        registry
            .register(AgentCard::new("chef", "caterer", "plans menus").with_capability("catering"))
            .unwrap();

        let (planner, _) = planner_with(
            r#"{"subtasks": [
                {"description": "book the venue", "capabilities": ["venue"], "agents": ["scout"]}
            ]}"#,
        );

        let err = planner
            .plan("book it", &registry.snapshot())
            .await
            .unwrap_err();
        assert!(err.is_decomposition(DecompositionReason::CapabilityMismatch));
        assert!(err.to_string().contains("book the venue"));
    }

    #[tokio::test]
    async fn garbled_proposals_are_malformed() {
        let (planner, _) = planner_with("sure, I'd be happy to help with that!");
        let err = planner
            .plan("plan the gala", &gala_registry().snapshot())
            .await
            .unwrap_err();
        assert!(err.is_decomposition(DecompositionReason::MalformedProposal));
    }

    #[tokio::test]
    async fn nested_planning_grafts_child_areas() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_completion(
            PLANNER_NAME,
            r#"{"subtasks": [
                {"description": "book the venue", "capabilities": ["venue"], "agents": ["scout", "vera"]}
            ]}"#,
        );
        backend.push_completion(
            PLANNER_NAME,
            r#"{"subtasks": [
                {"description": "negotiate the contract", "capabilities": ["venue"], "agents": ["scout", "vera"]}
            ]}"#,
        );
        let planner = TaskPlanner::new(Arc::clone(&backend) as Arc<dyn Reasoner>);

        let tree = planner
            .plan_nested("plan the gala", &gala_registry().snapshot(), 2)
            .await
            .unwrap();

        assert_eq!(tree.subtasks().count(), 2);
        let venue = &tree.root.children[0];
        assert_eq!(venue.children.len(), 1);
        assert_eq!(venue.children[0].description, "negotiate the contract");
        assert_eq!(venue.children[0].parent, Some(venue.id));
        assert_eq!(backend.invocations(PLANNER_NAME), 2);
    }
}
