//! The workspace arena.
//!
//! Every live workspace is owned here behind its own async mutex. The
//! scheduler locks one workspace for the whole of its advance pass, so
//! different workspaces progress concurrently while everything inside a
//! single workspace stays strictly sequential.

use crate::tree::{TaskNode, TaskTree};
use crate::workspace::Workspace;
use quorum_core::{QuorumError, QuorumResult, RegistrySnapshot};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Arena {
    workspaces: HashMap<Uuid, Arc<Mutex<Workspace>>>,
    /// Creation order, the basis for deterministic iteration.
    order: Vec<Uuid>,
    /// One workspace per tree node.
    by_node: HashMap<Uuid, Uuid>,
}

/// Creates, owns, and retires workspaces.
#[derive(Debug, Default)]
pub struct WorkspaceManager {
    arena: RwLock<Arena>,
}

impl WorkspaceManager {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates one workspace for a tree node.
    ///
    /// The parent is validated before anything is allocated: a dangling
    /// parent id fails immediately with an orphan error rather than
    /// leaving a disconnected workspace behind. Member roles come from
    /// the registry snapshot the plan was staffed against.
    pub async fn create_workspace(
        &self,
        node: &TaskNode,
        parent: Option<Uuid>,
        snapshot: &RegistrySnapshot,
    ) -> QuorumResult<Uuid> {
        let mut arena = self.arena.write().await;

        if let Some(parent_id) = parent {
            if !arena.workspaces.contains_key(&parent_id) {
                return Err(QuorumError::OrphanWorkspace(format!(
                    "parent workspace {parent_id} does not exist"
                )));
            }
        }
        if arena.by_node.contains_key(&node.id) {
            return Err(QuorumError::Engine(format!(
                "node {} already has a workspace",
                node.id
            )));
        }

        let workspace = if node.assigned.is_empty() {
            if parent.is_some() {
                return Err(QuorumError::Engine(format!(
                    "non-root node {} has no assigned agents",
                    node.id
                )));
            }
            Workspace::coordination(node.id, &node.description)
        } else {
            let mut members = BTreeMap::new();
            for name in &node.assigned {
                let card = snapshot.get(name).ok_or_else(|| {
                    QuorumError::Engine(format!("staffed agent `{name}` is not in the registry"))
                })?;
                members.insert(name.clone(), card.role.clone());
            }
            Workspace::new(node.id, &node.description, parent, members)?
        };

        let id = workspace.id;
        info!(
            workspace = %id,
            node = %node.id,
            members = workspace.members().len(),
            "workspace created"
        );
        arena.by_node.insert(node.id, id);
        arena.order.push(id);
        arena.workspaces.insert(id, Arc::new(Mutex::new(workspace)));
        Ok(id)
    }

    /// Creates workspaces for a whole tree, parents before children.
    ///
    /// Returns the non-root workspace ids in depth-first tree order; the
    /// root workspace is reachable through [`Self::workspace_for_node`].
    pub async fn materialize(
        &self,
        tree: &TaskTree,
        snapshot: &RegistrySnapshot,
    ) -> QuorumResult<Vec<Uuid>> {
        let root_ws = self.create_workspace(&tree.root, None, snapshot).await?;

        let mut created = Vec::new();
        let mut stack: Vec<(&TaskNode, Uuid)> = tree
            .root
            .children
            .iter()
            .rev()
            .map(|child| (child, root_ws))
            .collect();
        while let Some((node, parent_ws)) = stack.pop() {
            let ws = self.create_workspace(node, Some(parent_ws), snapshot).await?;
            created.push(ws);
            for child in node.children.iter().rev() {
                stack.push((child, ws));
            }
        }
        Ok(created)
    }

    /// Hands out the shared handle for one workspace.
    pub async fn get(&self, id: Uuid) -> QuorumResult<Arc<Mutex<Workspace>>> {
        self.arena
            .read()
            .await
            .workspaces
            .get(&id)
            .map(Arc::clone)
            .ok_or_else(|| QuorumError::Engine(format!("unknown workspace {id}")))
    }

    /// Resolves the workspace materialized for a tree node.
    pub async fn workspace_for_node(&self, node_id: Uuid) -> QuorumResult<Arc<Mutex<Workspace>>> {
        let ws_id = {
            let arena = self.arena.read().await;
            arena.by_node.get(&node_id).copied()
        }
        .ok_or_else(|| QuorumError::Engine(format!("node {node_id} has no workspace")))?;
        self.get(ws_id).await
    }

    /// True when the arena holds the workspace.
    pub async fn contains(&self, id: Uuid) -> bool {
        self.arena.read().await.workspaces.contains_key(&id)
    }

    /// Workspace ids in creation order.
    pub async fn ids(&self) -> Vec<Uuid> {
        self.arena.read().await.order.clone()
    }

    /// Number of live workspaces.
    pub async fn len(&self) -> usize {
        self.arena.read().await.workspaces.len()
    }

    /// True when no workspaces are live.
    pub async fn is_empty(&self) -> bool {
        self.arena.read().await.workspaces.is_empty()
    }

    /// Retires a terminal workspace from the arena and returns its handle.
    ///
    /// Live workspaces cannot be removed; they are either still scheduled
    /// or waiting to be, and dropping them would strand their members.
    pub async fn remove(&self, id: Uuid) -> QuorumResult<Arc<Mutex<Workspace>>> {
        let handle = self.get(id).await?;
        {
            let ws = handle.lock().await;
            if !ws.status().is_terminal() {
                return Err(QuorumError::Engine(format!(
                    "workspace {id} is {} and cannot be removed",
                    ws.status()
                )));
            }
        }
        let mut arena = self.arena.write().await;
        arena.workspaces.remove(&id);
        arena.order.retain(|ws_id| *ws_id != id);
        arena.by_node.retain(|_, ws_id| *ws_id != id);
        Ok(handle)
    }
}
