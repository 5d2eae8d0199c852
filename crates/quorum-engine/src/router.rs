//! Address resolution and message delivery inside a workspace.

use crate::workspace::Workspace;
use quorum_core::{Draft, QuorumError, QuorumResult, ROUTER, USER};
use quorum_reasoner::protocol;
use tracing::{debug, warn};

/// Delivers drafts into a workspace log.
///
/// The router holds no state; the log, the inboxes, and the sequence
/// counter all belong to the workspace, and every delivery happens under
/// that workspace's lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageRouter;

impl MessageRouter {
    /// Creates a router.
    pub fn new() -> Self {
        Self
    }

    /// Delivers one draft, returning the assigned sequence number.
    ///
    /// Delivery is total-or-fail. A draft for a non-member appends
    /// nothing of itself; instead the router records a failure notice
    /// addressed to the sender and returns the unknown-recipient error,
    /// which the scheduler treats as recoverable.
    pub fn route(
        &self,
        workspace: &mut Workspace,
        sender: &str,
        draft: Draft,
    ) -> QuorumResult<u64> {
        if let Some(name) = draft.recipient.member_name() {
            if !workspace.is_member(name) {
                let address = draft.recipient.to_string();
                warn!(
                    workspace = %workspace.id,
                    sender,
                    recipient = %address,
                    "unknown recipient, draft dropped"
                );
                self.record_failure_notice(workspace, sender, &address);
                return Err(QuorumError::UnknownRecipient(address));
            }
        }
        let seq = workspace.accept(sender, draft);
        debug!(workspace = %workspace.id, sender, seq, "message delivered");
        Ok(seq)
    }

    /// Seeds the startup briefing, one copy per member.
    ///
    /// The briefing is sent by the user so members see the task as an
    /// external request, and it lists the full roster so everyone knows
    /// who can be addressed.
    pub fn seed(&self, workspace: &mut Workspace, description: &str) -> QuorumResult<()> {
        let briefing = protocol::workspace_briefing(description, workspace.members());
        let roster: Vec<(String, String)> = workspace
            .members()
            .iter()
            .map(|(name, role)| (name.clone(), role.clone()))
            .collect();
        for (name, role) in roster {
            self.route(workspace, USER, Draft::to_agent(name, role, briefing.clone()))?;
        }
        debug!(workspace = %workspace.id, "workspace seeded");
        Ok(())
    }

    fn record_failure_notice(&self, workspace: &mut Workspace, sender: &str, address: &str) {
        // Only member senders get the in-log notice; a non-member sender
        // has no inbox to read it from.
        let Some(role) = workspace.member_role(sender).map(ToString::to_string) else {
            return;
        };
        let notice = Draft::to_agent(
            sender,
            role,
            format!("delivery failed: no workspace member is addressed by `{address}`"),
        );
        workspace.accept(ROUTER, notice);
    }
}
