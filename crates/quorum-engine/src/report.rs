//! Aggregation of workspace outcomes into one caller-facing report.

use crate::manager::WorkspaceManager;
use crate::tree::TaskTree;
use crate::workspace::WorkspaceStatus;
use chrono::{DateTime, Utc};
use quorum_core::QuorumResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Terminal outcome of one subtask workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskSummary {
    /// Subtask description from the task tree.
    pub subtask: String,
    /// The workspace that advanced it.
    pub workspace_id: Uuid,
    /// Status the workspace ended in.
    pub status: WorkspaceStatus,
    /// Members staffed on the workspace, sorted by name.
    pub participating_agents: Vec<String>,
    /// Messages accumulated in the log.
    pub message_count: usize,
    /// The user-facing result, or the last partial content when the
    /// workspace never reported.
    pub terminal_content: Option<String>,
    /// True when the workspace ended without a user-addressed report.
    pub incomplete: bool,
}

/// Worst-case outcome across all subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every subtask workspace completed.
    Completed,
    /// Some, but not all, subtask workspaces completed.
    PartiallyCompleted,
    /// No subtask workspace completed.
    Failed,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Completed => "completed",
            Self::PartiallyCompleted => "partially completed",
            Self::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// The result of one submitted task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalReport {
    /// The submitted task description.
    pub task: String,
    /// Outcome across all subtasks.
    pub overall: OverallStatus,
    /// One summary per subtask, in depth-first tree order.
    pub summaries: Vec<SubtaskSummary>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl FinalReport {
    /// Number of subtasks that completed.
    pub fn completed_count(&self) -> usize {
        self.summaries
            .iter()
            .filter(|summary| summary.status == WorkspaceStatus::Completed)
            .count()
    }

    /// True when every subtask completed.
    pub fn is_fully_complete(&self) -> bool {
        self.overall == OverallStatus::Completed
    }

    /// Finds a summary by its subtask description.
    pub fn summary_for(&self, subtask: &str) -> Option<&SubtaskSummary> {
        self.summaries
            .iter()
            .find(|summary| summary.subtask == subtask)
    }
}

/// Collects one summary per subtask workspace and grades the run.
///
/// Incomplete workspaces are surfaced, not hidden: their summaries carry
/// whatever content they last produced so a partially finished subtask
/// still reports its progress.
pub async fn aggregate(
    tree: &TaskTree,
    manager: &WorkspaceManager,
    task: &str,
    started_at: DateTime<Utc>,
) -> QuorumResult<FinalReport> {
    let mut summaries = Vec::new();
    for node in tree.subtasks() {
        let handle = manager.workspace_for_node(node.id).await?;
        let ws = handle.lock().await;
        let status = ws.status();
        summaries.push(SubtaskSummary {
            subtask: node.description.clone(),
            workspace_id: ws.id,
            status,
            participating_agents: ws.member_names().map(ToString::to_string).collect(),
            message_count: ws.message_count(),
            terminal_content: ws
                .terminal_content()
                .or_else(|| ws.last_content())
                .map(ToString::to_string),
            incomplete: status != WorkspaceStatus::Completed,
        });
    }
    let overall = overall_status(&summaries);
    Ok(FinalReport {
        task: task.to_string(),
        overall,
        summaries,
        started_at,
        finished_at: Utc::now(),
    })
}

fn overall_status(summaries: &[SubtaskSummary]) -> OverallStatus {
    let completed = summaries
        .iter()
        .filter(|summary| summary.status == WorkspaceStatus::Completed)
        .count();
    if completed == 0 {
        OverallStatus::Failed
    } else if completed == summaries.len() {
        OverallStatus::Completed
    } else {
        OverallStatus::PartiallyCompleted
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn summary(subtask: &str, status: WorkspaceStatus) -> SubtaskSummary {
        SubtaskSummary {
            subtask: subtask.into(),
            workspace_id: Uuid::new_v4(),
            status,
            participating_agents: vec!["scout".into(), "vera".into()],
            message_count: 4,
            terminal_content: Some("partial notes".into()),
            incomplete: status != WorkspaceStatus::Completed,
        }
    }

    #[test]
    fn all_completed_grades_completed() {
        let summaries = vec![
            summary("venue", WorkspaceStatus::Completed),
            summary("catering", WorkspaceStatus::Completed),
        ];
        assert_eq!(overall_status(&summaries), OverallStatus::Completed);
    }

    #[test]
    fn a_mix_grades_partially_completed() {
        let summaries = vec![
            summary("venue", WorkspaceStatus::Completed),
            summary("catering", WorkspaceStatus::Failed),
            summary("invitations", WorkspaceStatus::Exhausted),
        ];
        assert_eq!(
            overall_status(&summaries),
            OverallStatus::PartiallyCompleted
        );
    }

    #[test]
    fn no_completions_grades_failed() {
        let summaries = vec![
            summary("venue", WorkspaceStatus::Failed),
            summary("catering", WorkspaceStatus::Exhausted),
        ];
        assert_eq!(overall_status(&summaries), OverallStatus::Failed);
    }

    #[test]
    fn report_helpers_count_and_look_up() {
        let report = FinalReport {
            task: "plan the gala".into(),
            overall: OverallStatus::PartiallyCompleted,
            summaries: vec![
                summary("venue", WorkspaceStatus::Completed),
                summary("catering", WorkspaceStatus::Failed),
            ],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        assert_eq!(report.completed_count(), 1);
        assert!(!report.is_fully_complete());
        assert!(report.summary_for("catering").unwrap().incomplete);
        assert!(report.summary_for("fireworks").is_none());
    }
}
