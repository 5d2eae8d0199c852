//! The global scheduler.
//!
//! One engine advances every scheduled workspace to a terminal status.
//! Scheduling is round-based: each cycle snapshots the runnable set in
//! FIFO order, advances each workspace on its own spawned task, then
//! drops the ones that went terminal. Inside a workspace all work happens
//! under its mutex, so members never interleave within one log while
//! sibling workspaces run in parallel.

use crate::manager::WorkspaceManager;
use crate::router::MessageRouter;
use crate::workspace::{Workspace, WorkspaceStatus};
use quorum_core::{ExecutionBudget, Message, QuorumError, QuorumResult, RegistrySnapshot};
use quorum_reasoner::Reasoner;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Drives scheduled workspaces to their terminal statuses.
pub struct ExecutionEngine {
    manager: Arc<WorkspaceManager>,
    reasoner: Arc<dyn Reasoner>,
    snapshot: Arc<RegistrySnapshot>,
    budget: ExecutionBudget,
    router: MessageRouter,
    runnable: Mutex<Vec<Uuid>>,
    cancelled: AtomicBool,
}

impl ExecutionEngine {
    /// Creates an engine over an arena and a reasoning backend.
    pub fn new(
        manager: Arc<WorkspaceManager>,
        reasoner: Arc<dyn Reasoner>,
        snapshot: RegistrySnapshot,
        budget: ExecutionBudget,
    ) -> Self {
        Self {
            manager,
            reasoner,
            snapshot: Arc::new(snapshot),
            budget,
            router: MessageRouter::new(),
            runnable: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Routes the startup briefing into a workspace.
    pub async fn seed_workspace(&self, id: Uuid) -> QuorumResult<()> {
        let handle = self.manager.get(id).await?;
        let mut ws = handle.lock().await;
        let description = ws.description.clone();
        self.router.seed(&mut ws, &description)
    }

    /// Adds a workspace to the runnable set.
    ///
    /// Scheduling is idempotent: a workspace already in the set keeps its
    /// original position. Unknown ids are rejected.
    pub async fn schedule_workspace(&self, id: Uuid) -> QuorumResult<()> {
        if !self.manager.contains(id).await {
            return Err(QuorumError::Engine(format!(
                "cannot schedule unknown workspace {id}"
            )));
        }
        let mut runnable = self.runnable.lock().await;
        if !runnable.contains(&id) {
            runnable.push(id);
            info!(workspace = %id, position = runnable.len(), "workspace scheduled");
        }
        Ok(())
    }

    /// The runnable set in FIFO order.
    pub async fn scheduled(&self) -> Vec<Uuid> {
        self.runnable.lock().await.clone()
    }

    /// Requests cooperative cancellation of the whole run.
    ///
    /// The scheduler observes the flag at the next cycle boundary; the
    /// cycle in flight finishes normally.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Fails one live workspace and withdraws it from the runnable set.
    ///
    /// Siblings are untouched; an already terminal workspace only loses
    /// its runnable slot.
    pub async fn cancel_workspace(&self, id: Uuid) -> QuorumResult<()> {
        let handle = self.manager.get(id).await?;
        {
            let mut ws = handle.lock().await;
            if !ws.status().is_terminal() {
                ws.mark_failed()?;
                warn!(workspace = %id, "workspace cancelled");
            }
        }
        self.runnable.lock().await.retain(|ws_id| *ws_id != id);
        Ok(())
    }

    /// Runs cycles until the runnable set drains or a ceiling is hit.
    ///
    /// Terminal statuses land on the workspaces themselves; the run as a
    /// whole only errors on internal faults such as a panicked workspace
    /// task.
    pub async fn run_global_scheduler(&self) -> QuorumResult<()> {
        let mut cycle = 0u32;
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                self.terminate_remaining(WorkspaceStatus::Failed).await?;
                info!(cycles = cycle, "run cancelled");
                return Ok(());
            }

            let batch = self.scheduled().await;
            if batch.is_empty() {
                info!(cycles = cycle, "runnable set drained");
                return Ok(());
            }
            cycle += 1;
            debug!(cycle, workspaces = batch.len(), "cycle started");

            let mut tasks = JoinSet::new();
            for id in batch {
                let workspace = self.manager.get(id).await?;
                let reasoner = Arc::clone(&self.reasoner);
                let snapshot = Arc::clone(&self.snapshot);
                let budget = self.budget;
                let router = self.router;
                tasks.spawn(async move {
                    let outcome =
                        advance_workspace(&workspace, &*reasoner, &snapshot, budget, router).await;
                    (id, outcome)
                });
            }

            let mut terminal = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                let (id, outcome) = joined
                    .map_err(|err| QuorumError::Engine(format!("workspace task panicked: {err}")))?;
                match outcome {
                    Ok(status) if status.is_terminal() => terminal.push(id),
                    Ok(_) => {}
                    Err(err) => return Err(err),
                }
            }
            if !terminal.is_empty() {
                self.runnable
                    .lock()
                    .await
                    .retain(|id| !terminal.contains(id));
            }

            if cycle >= self.budget.max_cycles {
                self.terminate_remaining(WorkspaceStatus::Exhausted).await?;
                warn!(cycles = cycle, "cycle budget spent, run stopped");
                return Ok(());
            }
        }
    }

    /// Marks everything still runnable with the given terminal status.
    async fn terminate_remaining(&self, status: WorkspaceStatus) -> QuorumResult<()> {
        let remaining: Vec<Uuid> = std::mem::take(&mut *self.runnable.lock().await);
        for id in remaining {
            let handle = self.manager.get(id).await?;
            let mut ws = handle.lock().await;
            if ws.status().is_terminal() {
                continue;
            }
            match status {
                WorkspaceStatus::Exhausted => ws.mark_exhausted()?,
                _ => ws.mark_failed()?,
            }
            warn!(workspace = %id, status = %status, "workspace terminated by scheduler");
        }
        Ok(())
    }
}

/// Advances one workspace by draining up to a cycle's worth of events.
///
/// Events drain oldest first across all inboxes. The turn ceiling is
/// checked before each invocation so a member at its limit never reasons
/// again; the event stays queued as evidence the workspace was cut off
/// mid-conversation.
async fn advance_workspace(
    workspace: &Mutex<Workspace>,
    reasoner: &dyn Reasoner,
    snapshot: &RegistrySnapshot,
    budget: ExecutionBudget,
    router: MessageRouter,
) -> QuorumResult<WorkspaceStatus> {
    let mut ws = workspace.lock().await;
    if ws.status().is_terminal() {
        return Ok(ws.status());
    }
    ws.mark_running()?;

    let mut drained = 0u32;
    while drained < budget.max_events_per_cycle {
        let Some((member, seq)) = ws.next_pending() else {
            break;
        };

        if ws.turns(&member) >= budget.max_agent_turns {
            warn!(
                workspace = %ws.id,
                member = %member,
                turns = ws.turns(&member),
                "turn budget spent, workspace exhausted"
            );
            ws.mark_exhausted()?;
            return Ok(ws.status());
        }

        let Some(card) = snapshot.get(&member).cloned() else {
            error!(workspace = %ws.id, member = %member, "member missing from registry");
            ws.mark_failed()?;
            return Ok(ws.status());
        };

        ws.pop_event(&member);
        let turn = ws.record_turn(&member);
        drained += 1;

        let log: Vec<Message> = ws.transcript().to_vec();
        debug!(workspace = %ws.id, member = %member, seq, turn, "invoking member");

        match reasoner.invoke(&card, &log).await {
            Ok(drafts) => {
                for draft in drafts {
                    if let Err(err) = router.route(&mut ws, &member, draft) {
                        // Unknown recipients are recoverable; the failure
                        // notice is already in the log.
                        warn!(
                            workspace = %ws.id,
                            member = %member,
                            error = %err,
                            "draft dropped"
                        );
                    }
                }
            }
            Err(err) => {
                error!(workspace = %ws.id, member = %member, error = %err, "reasoning failed");
                ws.mark_failed()?;
                return Ok(ws.status());
            }
        }
    }

    // Completion needs both halves: a report for the user and nothing
    // left to react to.
    if ws.has_terminal_message() && ws.pending_events() == 0 {
        ws.mark_completed()?;
        info!(workspace = %ws.id, messages = ws.message_count(), "workspace completed");
    }
    Ok(ws.status())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use quorum_core::AgentRegistry;
    use quorum_reasoner::ScriptedBackend;

    #[tokio::test]
    async fn scheduling_unknown_workspaces_is_rejected() {
        let manager = Arc::new(WorkspaceManager::new());
        let registry = AgentRegistry::new();
        let engine = ExecutionEngine::new(
            manager,
            Arc::new(ScriptedBackend::new()),
            registry.snapshot(),
            ExecutionBudget::default(),
        );
        assert!(engine.schedule_workspace(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn an_empty_runnable_set_ends_the_run_immediately() {
        let manager = Arc::new(WorkspaceManager::new());
        let registry = AgentRegistry::new();
        let engine = ExecutionEngine::new(
            manager,
            Arc::new(ScriptedBackend::new()),
            registry.snapshot(),
            ExecutionBudget::default(),
        );
        engine.run_global_scheduler().await.unwrap();
        assert!(engine.scheduled().await.is_empty());
    }
}
