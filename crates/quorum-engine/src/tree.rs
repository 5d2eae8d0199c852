//! Task trees: the validated output of planning.
//!
//! A tree always has a root node carrying the original task. Every other
//! node is a subtask staffed with at least two agents, which is the
//! minimum group that can actually collaborate in a workspace.

use quorum_core::{QuorumError, QuorumResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A staffed subtask handed to [`TaskTree::new`].
#[derive(Debug, Clone)]
pub struct StaffedSubtask {
    /// What the subtask covers.
    pub description: String,
    /// Names of the agents staffed on it, at least two.
    pub agents: BTreeSet<String>,
}

/// One node of a task tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNode {
    /// Unique node identifier.
    pub id: Uuid,
    /// Description of the task or subtask.
    pub description: String,
    /// Agent names staffed on this node; always empty on the root.
    pub assigned: BTreeSet<String>,
    /// Parent node, absent on the root.
    pub parent: Option<Uuid>,
    /// Child subtasks in planning order.
    pub children: Vec<TaskNode>,
}

/// A validated decomposition of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTree {
    /// The root node carrying the original task description.
    pub root: TaskNode,
}

impl TaskTree {
    /// Builds a single-level tree from a task and its staffed subtasks.
    ///
    /// Rejects subtasks with fewer than two agents; the planner is
    /// expected to have repaired or refused such staffing already, so a
    /// violation here is an internal bug rather than a planning outcome.
    pub fn new(task: impl Into<String>, subtasks: Vec<StaffedSubtask>) -> QuorumResult<Self> {
        let root_id = Uuid::new_v4();
        let mut children = Vec::with_capacity(subtasks.len());
        for subtask in subtasks {
            if subtask.agents.len() < 2 {
                return Err(QuorumError::Engine(format!(
                    "subtask `{}` staffed with {} agent(s), minimum is 2",
                    subtask.description,
                    subtask.agents.len()
                )));
            }
            children.push(TaskNode {
                id: Uuid::new_v4(),
                description: subtask.description,
                assigned: subtask.agents,
                parent: Some(root_id),
                children: Vec::new(),
            });
        }
        Ok(Self {
            root: TaskNode {
                id: root_id,
                description: task.into(),
                assigned: BTreeSet::new(),
                parent: None,
                children,
            },
        })
    }

    /// Splices another tree's subtasks under an existing node.
    ///
    /// The donor's root is discarded; its children become children of
    /// `node_id`. Grandchildren keep their existing parent links, which
    /// stay valid because only the top spliced level changes parents.
    pub fn graft(mut self, node_id: Uuid, donor: TaskTree) -> QuorumResult<Self> {
        let Some(target) = find_mut(&mut self.root, node_id) else {
            return Err(QuorumError::Engine(format!(
                "graft target {node_id} is not in the tree"
            )));
        };
        for mut child in donor.root.children {
            child.parent = Some(node_id);
            target.children.push(child);
        }
        Ok(self)
    }

    /// Depth-first iterator, each parent before its children.
    pub fn iter(&self) -> impl Iterator<Item = &TaskNode> {
        let mut stack = vec![&self.root];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            for child in node.children.iter().rev() {
                stack.push(child);
            }
            Some(node)
        })
    }

    /// Looks a node up by id anywhere in the tree.
    pub fn get(&self, id: Uuid) -> Option<&TaskNode> {
        self.iter().find(|node| node.id == id)
    }

    /// Iterates every non-root node in depth-first order.
    pub fn subtasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.iter().filter(|node| node.parent.is_some())
    }

    /// Total node count, root included.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True only for a degenerate tree with no subtasks.
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }
}

fn find_mut(node: &mut TaskNode, id: Uuid) -> Option<&mut TaskNode> {
    if node.id == id {
        return Some(node);
    }
    for child in &mut node.children {
        if let Some(found) = find_mut(child, id) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> BTreeSet<String> {
        [a.to_string(), b.to_string()].into()
    }

    fn sample_tree() -> TaskTree {
        TaskTree::new(
            "plan the gala",
            vec![
                StaffedSubtask {
                    description: "book the venue".into(),
                    agents: pair("scout", "vera"),
                },
                StaffedSubtask {
                    description: "arrange catering".into(),
                    agents: pair("chef", "nina"),
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn root_carries_task_and_no_agents() {
        let tree = sample_tree();
        assert_eq!(tree.root.description, "plan the gala");
        assert!(tree.root.assigned.is_empty());
        assert!(tree.root.parent.is_none());
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn children_link_back_to_the_root() {
        let tree = sample_tree();
        for child in &tree.root.children {
            assert_eq!(child.parent, Some(tree.root.id));
        }
    }

    #[test]
    fn understaffed_subtasks_are_rejected() {
        let result = TaskTree::new(
            "solo work",
            vec![StaffedSubtask {
                description: "impossible".into(),
                agents: ["loner".to_string()].into(),
            }],
        );
        assert!(matches!(result, Err(QuorumError::Engine(_))));
    }

    #[test]
    fn iteration_is_depth_first_parent_before_children() {
        let tree = sample_tree();
        let descriptions: Vec<&str> = tree.iter().map(|n| n.description.as_str()).collect();
        assert_eq!(
            descriptions,
            ["plan the gala", "book the venue", "arrange catering"]
        );
    }

    #[test]
    fn graft_splices_subtasks_and_reparents_them() {
        let tree = sample_tree();
        let venue_id = tree.root.children[0].id;

        let donor = TaskTree::new(
            "book the venue",
            vec![StaffedSubtask {
                description: "negotiate the contract".into(),
                agents: pair("scout", "vera"),
            }],
        )
        .unwrap();

        let tree = tree.graft(venue_id, donor).unwrap();
        assert_eq!(tree.len(), 4);

        let grandchild = tree
            .iter()
            .find(|n| n.description == "negotiate the contract")
            .unwrap();
        assert_eq!(grandchild.parent, Some(venue_id));
        assert_eq!(tree.subtasks().count(), 3);
    }

    #[test]
    fn graft_rejects_unknown_targets() {
        let tree = sample_tree();
        let donor = sample_tree();
        assert!(matches!(
            tree.graft(Uuid::new_v4(), donor),
            Err(QuorumError::Engine(_))
        ));
    }
}
