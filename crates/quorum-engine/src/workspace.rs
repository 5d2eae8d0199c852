//! Workspaces: isolated agent groups sharing one ordered log.
//!
//! All communication state lives here. The log is append-only with
//! strictly increasing sequence numbers, inboxes hold pending sequence
//! numbers per member, and the status machine only ever moves forward.

use chrono::{DateTime, Utc};
use quorum_core::{Draft, Message, QuorumError, QuorumResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceStatus {
    /// Created and seeded, not yet advanced.
    Pending,
    /// Actively draining inbox events.
    Running,
    /// A user-addressed report exists and no events remain.
    Completed,
    /// A resource ceiling was hit before completion.
    Exhausted,
    /// A reasoning failure or cancellation stopped the work.
    Failed,
}

impl WorkspaceStatus {
    /// True for statuses that never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Exhausted | Self::Failed)
    }
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// An isolated group of agents advancing one subtask.
///
/// Mutation goes through methods so the invariants hold: sequence numbers
/// are assigned once and never reused, the log is append-only, and
/// terminal statuses are final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Unique workspace identifier.
    pub id: Uuid,
    /// The task-tree node this workspace executes.
    pub node_id: Uuid,
    /// Subtask description copied from the node.
    pub description: String,
    /// Parent workspace, absent on the root.
    pub parent: Option<Uuid>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    members: BTreeMap<String, String>,
    log: Vec<Message>,
    inboxes: BTreeMap<String, VecDeque<u64>>,
    next_seq: u64,
    turns: BTreeMap<String, u32>,
    status: WorkspaceStatus,
}

impl Workspace {
    /// Creates a workspace for a staffed subtask node.
    ///
    /// `members` maps agent name to role tag and must hold at least two
    /// entries; smaller groups cannot collaborate and are planner bugs by
    /// the time they reach here.
    pub fn new(
        node_id: Uuid,
        description: impl Into<String>,
        parent: Option<Uuid>,
        members: BTreeMap<String, String>,
    ) -> QuorumResult<Self> {
        let description = description.into();
        if members.len() < 2 {
            return Err(QuorumError::Engine(format!(
                "workspace for `{description}` has {} member(s), minimum is 2",
                members.len()
            )));
        }
        let inboxes = members
            .keys()
            .map(|name| (name.clone(), VecDeque::new()))
            .collect();
        Ok(Self {
            id: Uuid::new_v4(),
            node_id,
            description,
            parent,
            created_at: Utc::now(),
            members,
            log: Vec::new(),
            inboxes,
            next_seq: 1,
            turns: BTreeMap::new(),
            status: WorkspaceStatus::Pending,
        })
    }

    /// Creates the memberless coordination workspace for a tree root.
    ///
    /// The root never runs agents; it exists so every subtask workspace
    /// has a parent and so the run outcome has a place to land.
    pub fn coordination(node_id: Uuid, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_id,
            description: description.into(),
            parent: None,
            created_at: Utc::now(),
            members: BTreeMap::new(),
            log: Vec::new(),
            inboxes: BTreeMap::new(),
            next_seq: 1,
            turns: BTreeMap::new(),
            status: WorkspaceStatus::Pending,
        }
    }

    /// Member name to role tag.
    pub fn members(&self) -> &BTreeMap<String, String> {
        &self.members
    }

    /// Iterates member names in sorted order.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// True when `name` is a member of this workspace.
    pub fn is_member(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Role tag of a member, if present.
    pub fn member_role(&self, name: &str) -> Option<&str> {
        self.members.get(name).map(String::as_str)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> WorkspaceStatus {
        self.status
    }

    /// Moves to Running. Legal from Pending; a no-op when already Running.
    pub fn mark_running(&mut self) -> QuorumResult<()> {
        self.transition(WorkspaceStatus::Running)
    }

    /// Moves to Completed.
    pub fn mark_completed(&mut self) -> QuorumResult<()> {
        self.transition(WorkspaceStatus::Completed)
    }

    /// Moves to Exhausted.
    pub fn mark_exhausted(&mut self) -> QuorumResult<()> {
        self.transition(WorkspaceStatus::Exhausted)
    }

    /// Moves to Failed.
    pub fn mark_failed(&mut self) -> QuorumResult<()> {
        self.transition(WorkspaceStatus::Failed)
    }

    fn transition(&mut self, to: WorkspaceStatus) -> QuorumResult<()> {
        // Same-status transitions are no-ops; terminal statuses are final.
        let legal = to == self.status
            || match (self.status, to) {
                (WorkspaceStatus::Pending, WorkspaceStatus::Running) => true,
                (WorkspaceStatus::Pending | WorkspaceStatus::Running, target) => {
                    target.is_terminal()
                }
                _ => false,
            };
        if !legal {
            return Err(QuorumError::Engine(format!(
                "illegal workspace transition {} -> {to}",
                self.status
            )));
        }
        self.status = to;
        Ok(())
    }

    /// Seals a draft into the log and enqueues it for a member recipient.
    ///
    /// Caller validates recipients first; appending and enqueueing are one
    /// step so no message can exist half-delivered. Returns the assigned
    /// sequence number.
    pub(crate) fn accept(&mut self, sender: &str, draft: Draft) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        let message = Message::sealed(sender, draft, seq);
        if let Some(name) = message.recipient.member_name() {
            self.inboxes
                .entry(name.to_string())
                .or_default()
                .push_back(seq);
        }
        self.log.push(message);
        seq
    }

    /// The full ordered log.
    pub fn transcript(&self) -> &[Message] {
        &self.log
    }

    /// Number of messages in the log.
    pub fn message_count(&self) -> usize {
        self.log.len()
    }

    /// Total queued events across all inboxes.
    pub fn pending_events(&self) -> usize {
        self.inboxes.values().map(VecDeque::len).sum()
    }

    /// The oldest pending event across all members.
    ///
    /// Inboxes are individually ordered, so the globally oldest event is
    /// the smallest front sequence number among them.
    pub fn next_pending(&self) -> Option<(String, u64)> {
        self.inboxes
            .iter()
            .filter_map(|(name, queue)| queue.front().map(|seq| (name.clone(), *seq)))
            .min_by_key(|(_, seq)| *seq)
    }

    /// Pops the front of one member's inbox.
    pub(crate) fn pop_event(&mut self, member: &str) -> Option<u64> {
        self.inboxes.get_mut(member).and_then(VecDeque::pop_front)
    }

    /// Reasoning turns the member has taken so far.
    pub fn turns(&self, member: &str) -> u32 {
        self.turns.get(member).copied().unwrap_or(0)
    }

    /// Records one more turn for the member, returning the new count.
    pub(crate) fn record_turn(&mut self, member: &str) -> u32 {
        let count = self.turns.entry(member.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// True once any user-addressed message is in the log.
    pub fn has_terminal_message(&self) -> bool {
        self.log.iter().any(Message::is_terminal)
    }

    /// Content of the latest user-addressed message, if any.
    ///
    /// Members may report to the user more than once; later reports
    /// supersede earlier ones, so the last one is the result.
    pub fn terminal_content(&self) -> Option<&str> {
        self.log
            .iter()
            .rev()
            .find(|message| message.is_terminal())
            .map(|message| message.content.as_str())
    }

    /// Content of the newest message regardless of recipient.
    pub fn last_content(&self) -> Option<&str> {
        self.log.last().map(|message| message.content.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn duo() -> BTreeMap<String, String> {
        [
            ("scout".to_string(), "surveyor".to_string()),
            ("vera".to_string(), "inspector".to_string()),
        ]
        .into()
    }

    fn sample() -> Workspace {
        Workspace::new(Uuid::new_v4(), "book the venue", None, duo()).unwrap()
    }

    #[test]
    fn rejects_groups_smaller_than_two() {
        let solo: BTreeMap<String, String> = [("loner".to_string(), "r".to_string())].into();
        assert!(Workspace::new(Uuid::new_v4(), "solo", None, solo).is_err());
        assert!(Workspace::new(Uuid::new_v4(), "nobody", None, BTreeMap::new()).is_err());
    }

    #[test]
    fn coordination_workspaces_may_be_empty() {
        let root = Workspace::coordination(Uuid::new_v4(), "plan the gala");
        assert!(root.members().is_empty());
        assert_eq!(root.status(), WorkspaceStatus::Pending);
    }

    #[test]
    fn sequence_numbers_start_at_one_and_increase() {
        let mut ws = sample();
        let first = ws.accept("USER", Draft::to_agent("scout", "surveyor", "go"));
        let second = ws.accept("scout", Draft::to_agent("vera", "inspector", "check pier 9"));
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(ws.message_count(), 2);
        assert_eq!(ws.transcript()[1].seq, 2);
    }

    #[test]
    fn member_recipients_are_enqueued_and_user_is_not() {
        let mut ws = sample();
        ws.accept("USER", Draft::to_agent("scout", "surveyor", "go"));
        ws.accept("scout", Draft::to_user("done"));
        assert_eq!(ws.pending_events(), 1);
        assert_eq!(ws.next_pending(), Some(("scout".to_string(), 1)));
    }

    #[test]
    fn next_pending_follows_global_sequence_order() {
        let mut ws = sample();
        ws.accept("USER", Draft::to_agent("vera", "inspector", "first"));
        ws.accept("USER", Draft::to_agent("scout", "surveyor", "second"));
        ws.accept("USER", Draft::to_agent("vera", "inspector", "third"));

        assert_eq!(ws.next_pending(), Some(("vera".to_string(), 1)));
        ws.pop_event("vera");
        assert_eq!(ws.next_pending(), Some(("scout".to_string(), 2)));
        ws.pop_event("scout");
        assert_eq!(ws.next_pending(), Some(("vera".to_string(), 3)));
    }

    #[test]
    fn terminal_statuses_are_final() {
        let mut ws = sample();
        ws.mark_running().unwrap();
        ws.mark_completed().unwrap();
        assert!(ws.mark_running().is_err());
        assert!(ws.mark_failed().is_err());
        // Repeating the current terminal status stays a no-op.
        ws.mark_completed().unwrap();
        assert_eq!(ws.status(), WorkspaceStatus::Completed);
    }

    #[test]
    fn pending_may_fail_directly_for_cancellation() {
        let mut ws = sample();
        ws.mark_failed().unwrap();
        assert_eq!(ws.status(), WorkspaceStatus::Failed);
    }

    #[test]
    fn running_cannot_return_to_pending() {
        let mut ws = sample();
        ws.mark_running().unwrap();
        assert!(ws.transition(WorkspaceStatus::Pending).is_err());
    }

    #[test]
    fn last_user_message_wins_as_terminal_content() {
        let mut ws = sample();
        ws.accept("scout", Draft::to_user("draft findings"));
        ws.accept("scout", Draft::to_agent("vera", "inspector", "double-check"));
        ws.accept("vera", Draft::to_user("final findings"));
        assert!(ws.has_terminal_message());
        assert_eq!(ws.terminal_content(), Some("final findings"));
        assert_eq!(ws.last_content(), Some("final findings"));
    }

    #[test]
    fn turn_ledger_counts_per_member() {
        let mut ws = sample();
        assert_eq!(ws.turns("scout"), 0);
        assert_eq!(ws.record_turn("scout"), 1);
        assert_eq!(ws.record_turn("scout"), 2);
        assert_eq!(ws.turns("vera"), 0);
    }
}
