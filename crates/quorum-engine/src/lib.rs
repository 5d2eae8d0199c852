//! Task decomposition and parallel workspace execution.
//!
//! This crate turns one submitted task into a staffed tree of subtasks,
//! materializes an isolated workspace per subtask, advances all of them
//! concurrently through a global scheduler, and folds the terminal
//! workspaces back into a single report.
//!
//! The usual entry point is [`Coordinator::submit`], which runs the whole
//! pipeline. The pieces underneath are public so callers can plan,
//! schedule, and cancel individually:
//!
//! - [`TaskPlanner`] — reasoner-driven decomposition into a [`TaskTree`].
//! - [`WorkspaceManager`] — the arena owning every live [`Workspace`].
//! - [`MessageRouter`] — address resolution and total-or-fail delivery.
//! - [`ExecutionEngine`] — the cycle-based global scheduler.
//! - [`FinalReport`] — per-subtask summaries plus the overall grade.

/// End-to-end submission pipeline.
pub mod coordinator;
/// The global scheduler.
pub mod engine;
/// Workspace ownership and parent linkage.
pub mod manager;
/// Reasoner-driven task decomposition.
pub mod planner;
/// Outcome aggregation.
pub mod report;
/// In-workspace message delivery.
pub mod router;
/// Workspace archival.
pub mod store;
/// Task trees.
pub mod tree;
/// Workspaces and their lifecycle.
pub mod workspace;

pub use coordinator::Coordinator;
pub use engine::ExecutionEngine;
pub use manager::WorkspaceManager;
pub use planner::TaskPlanner;
pub use report::{aggregate, FinalReport, OverallStatus, SubtaskSummary};
pub use router::MessageRouter;
pub use store::{FileWorkspaceStore, WorkspaceStore};
pub use tree::{StaffedSubtask, TaskNode, TaskTree};
pub use workspace::{Workspace, WorkspaceStatus};
