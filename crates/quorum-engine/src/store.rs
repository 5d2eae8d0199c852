//! Archival of finished workspaces and run reports.
//!
//! The engine only ever writes archives; nothing reads them back into a
//! run. Keeping persistence write-only means a broken archive can never
//! corrupt live scheduling state.

use crate::report::FinalReport;
use crate::workspace::Workspace;
use async_trait::async_trait;
use quorum_core::QuorumResult;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Write-only sink for terminal workspaces and final reports.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Persists one workspace transcript.
    async fn archive_workspace(&self, workspace: &Workspace) -> QuorumResult<()>;

    /// Persists the final report of a run.
    async fn archive_report(&self, report: &FinalReport) -> QuorumResult<()>;

    /// Ids of the workspaces archived so far.
    async fn list_archived(&self) -> QuorumResult<Vec<Uuid>>;
}

/// File-backed archive: one pretty-printed JSON file per workspace and
/// per report, all in a single directory.
pub struct FileWorkspaceStore {
    dir: PathBuf,
}

impl FileWorkspaceStore {
    /// Opens an archive directory, creating it if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> QuorumResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn workspace_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl WorkspaceStore for FileWorkspaceStore {
    async fn archive_workspace(&self, workspace: &Workspace) -> QuorumResult<()> {
        let json = serde_json::to_string_pretty(workspace)?;
        let path = self.workspace_path(workspace.id);
        tokio::fs::write(&path, json).await?;
        debug!(workspace = %workspace.id, path = %path.display(), "workspace archived");
        Ok(())
    }

    async fn archive_report(&self, report: &FinalReport) -> QuorumResult<()> {
        let json = serde_json::to_string_pretty(report)?;
        // Report files carry a prefix so they never collide with, or list
        // as, workspace archives.
        let path = self.dir.join(format!("report-{}.json", Uuid::new_v4()));
        tokio::fs::write(&path, json).await?;
        debug!(path = %path.display(), "report archived");
        Ok(())
    }

    async fn list_archived(&self) -> QuorumResult<Vec<Uuid>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(ToString::to_string) else {
                continue;
            };
            if let Some(stem) = name.strip_suffix(".json") {
                if let Ok(id) = Uuid::parse_str(stem) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::report::OverallStatus;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn venue_workspace() -> Workspace {
        let members: BTreeMap<String, String> = [
            ("scout".to_string(), "surveyor".to_string()),
            ("vera".to_string(), "inspector".to_string()),
        ]
        .into();
        Workspace::new(Uuid::new_v4(), "book the venue", None, members).unwrap()
    }

    #[tokio::test]
    async fn archives_workspaces_and_lists_them() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWorkspaceStore::new(dir.path()).await.unwrap();

        let ws = venue_workspace();
        store.archive_workspace(&ws).await.unwrap();

        let listed = store.list_archived().await.unwrap();
        assert_eq!(listed, vec![ws.id]);

        let raw = tokio::fs::read_to_string(dir.path().join(format!("{}.json", ws.id)))
            .await
            .unwrap();
        let parsed: Workspace = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.description, "book the venue");
        assert!(parsed.is_member("scout"));
    }

    #[tokio::test]
    async fn reports_are_stored_but_never_listed_as_workspaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWorkspaceStore::new(dir.path()).await.unwrap();

        let report = FinalReport {
            task: "plan the gala".into(),
            overall: OverallStatus::Completed,
            summaries: Vec::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        store.archive_report(&report).await.unwrap();

        assert!(store.list_archived().await.unwrap().is_empty());
        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        let file = entries.next().unwrap().unwrap();
        assert!(file.file_name().to_string_lossy().starts_with("report-"));
    }

    #[tokio::test]
    async fn reopening_an_existing_directory_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWorkspaceStore::new(dir.path()).await.unwrap();
        store.archive_workspace(&venue_workspace()).await.unwrap();

        let reopened = FileWorkspaceStore::new(dir.path()).await.unwrap();
        assert_eq!(reopened.list_archived().await.unwrap().len(), 1);
    }
}
