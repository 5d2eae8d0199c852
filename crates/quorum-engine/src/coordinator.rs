//! The caller-facing submission pipeline.
//!
//! `submit` is the one-call path: plan, materialize, seed, schedule, run,
//! aggregate, and optionally archive. Callers needing mid-run control,
//! such as cancellation, drive [`TaskPlanner`], [`WorkspaceManager`], and
//! [`ExecutionEngine`] directly; submit is built from nothing else.

use crate::engine::ExecutionEngine;
use crate::manager::WorkspaceManager;
use crate::planner::TaskPlanner;
use crate::report::{aggregate, FinalReport, OverallStatus};
use crate::store::WorkspaceStore;
use chrono::Utc;
use quorum_core::{AgentRegistry, ExecutionBudget, QuorumResult};
use quorum_reasoner::Reasoner;
use std::sync::Arc;
use tracing::info;

/// Runs whole tasks end to end against a registry and a reasoner.
pub struct Coordinator {
    registry: Arc<AgentRegistry>,
    reasoner: Arc<dyn Reasoner>,
    store: Option<Arc<dyn WorkspaceStore>>,
    max_depth: u32,
}

impl Coordinator {
    /// Creates a coordinator with single-level planning and no archive.
    pub fn new(registry: Arc<AgentRegistry>, reasoner: Arc<dyn Reasoner>) -> Self {
        Self {
            registry,
            reasoner,
            store: None,
            max_depth: 1,
        }
    }

    /// Archives finished workspaces and reports to the given store.
    pub fn with_store(mut self, store: Arc<dyn WorkspaceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Allows nested planning down to `depth` levels of subtasks.
    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    /// Runs one task to a final report.
    ///
    /// The registry is snapshotted once at the start; agents registered
    /// mid-run join the next submission, never this one.
    pub async fn submit(
        &self,
        task_description: &str,
        budget: ExecutionBudget,
    ) -> QuorumResult<FinalReport> {
        let started_at = Utc::now();
        budget.validate()?;
        let snapshot = self.registry.snapshot();
        info!(task = %task_description, agents = snapshot.len(), "task submitted");

        let planner = TaskPlanner::new(Arc::clone(&self.reasoner));
        let tree = planner
            .plan_nested(task_description, &snapshot, self.max_depth)
            .await?;

        let manager = Arc::new(WorkspaceManager::new());
        let children = manager.materialize(&tree, &snapshot).await?;

        let engine = ExecutionEngine::new(
            Arc::clone(&manager),
            Arc::clone(&self.reasoner),
            snapshot,
            budget,
        );
        for id in &children {
            engine.seed_workspace(*id).await?;
            engine.schedule_workspace(*id).await?;
        }
        engine.run_global_scheduler().await?;

        let report = aggregate(&tree, &manager, task_description, started_at).await?;

        // The coordination root mirrors the outcome so no workspace is
        // left pending after the run.
        let root = manager.workspace_for_node(tree.root.id).await?;
        {
            let mut ws = root.lock().await;
            match report.overall {
                OverallStatus::Failed => ws.mark_failed()?,
                _ => ws.mark_completed()?,
            }
        }

        if let Some(store) = &self.store {
            archive_run(store.as_ref(), &manager, &report).await?;
        }

        info!(
            overall = %report.overall,
            completed = report.completed_count(),
            subtasks = report.summaries.len(),
            "task finished"
        );
        Ok(report)
    }
}

/// Retires every workspace into the store, then archives the report.
async fn archive_run(
    store: &dyn WorkspaceStore,
    manager: &WorkspaceManager,
    report: &FinalReport,
) -> QuorumResult<()> {
    for id in manager.ids().await {
        let handle = manager.remove(id).await?;
        let ws = handle.lock().await;
        store.archive_workspace(&ws).await?;
    }
    store.archive_report(report).await?;
    Ok(())
}
