//! The wire language spoken between the engine and its reasoning backends.
//!
//! Two directions live here: prompt rendering (what a member or the planner
//! is told) and reply parsing (what the engine accepts back). Keeping both
//! in one module means the contract can only drift in lockstep.

use quorum_core::{
    AgentCard, DecompositionReason, Draft, Message, QuorumError, QuorumResult, RegistrySnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the synthetic card the planner is invoked under.
pub const PLANNER_NAME: &str = "planner";

/// Marker prefixing the briefing message seeded into every workspace.
pub const STARTUP_MARKER: &str = "[startup]";

const REPLY_CONTRACT: &str = "Reply with a single JSON object of the form \
{\"to\": \"name@role\", \"content\": \"...\"} to send one message, or a JSON array \
of such objects to send several. Address \"USER\" to deliver a final result to \
the submitting user. Reply with an empty body to stay silent this turn. Do not \
add prose outside the JSON.";

/// Renders the system prompt a member is invoked under.
pub fn interaction_protocol(card: &AgentCard) -> String {
    let mut prompt = format!("You are {}. {}\n", card.address(), card.description);
    if !card.capabilities.is_empty() {
        let tags: Vec<&str> = card.capabilities.iter().map(String::as_str).collect();
        prompt.push_str(&format!("Your capabilities: {}.\n", tags.join(", ")));
    }
    prompt.push_str(
        "You work inside a shared workspace whose full message log you can see. \
         Messages addressed to you arrive as user turns.\n",
    );
    prompt.push_str(REPLY_CONTRACT);
    prompt
}

/// Renders the briefing message seeded to every member when a workspace starts.
///
/// `members` maps member name to role tag, the workspace's own roster.
pub fn workspace_briefing(description: &str, members: &BTreeMap<String, String>) -> String {
    let mut briefing = format!("{STARTUP_MARKER} New task for this workspace: {description}\n\n");
    briefing.push_str("Workspace members:\n");
    for (name, role) in members {
        briefing.push_str(&format!("- {name}@{role}\n"));
    }
    briefing.push_str(
        "\nCoordinate by messaging the other members directly. \
         When the work is done, send the result to USER.",
    );
    briefing
}

/// Renders the decomposition prompt for one planning invocation.
pub fn planner_instructions(task: &str, snapshot: &RegistrySnapshot) -> String {
    let mut prompt = String::from(
        "You are the planning faculty of a multi-agent execution engine. \
         Break the task below into independent subtask areas that can run in \
         parallel, and staff each area from the roster. Every area needs at \
         least two agents so members can check each other's work. Only name \
         agents that appear in the roster.\n\n",
    );
    prompt.push_str(&format!("Task: {task}\n\nRoster:\n"));
    for card in snapshot.iter() {
        let tags: Vec<&str> = card.capabilities.iter().map(String::as_str).collect();
        prompt.push_str(&format!(
            "- {}: {} [{}]\n",
            card.address(),
            card.description,
            tags.join(", ")
        ));
    }
    prompt.push_str(
        "\nRespond with JSON only:\n\
         {\"subtasks\": [{\"description\": \"...\", \"capabilities\": [\"...\"], \
         \"agents\": [\"...\", \"...\"]}]}",
    );
    prompt
}

/// One subtask area in a decomposition proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalSubtask {
    /// What this area covers.
    pub description: String,
    /// Capability tags the area requires.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Agent names proposed for the area.
    #[serde(default)]
    pub agents: Vec<String>,
}

/// A parsed decomposition proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposed subtask areas in presentation order.
    pub subtasks: Vec<ProposalSubtask>,
}

/// Parses a planning reply into a [`Proposal`].
///
/// Any shape violation is a malformed-proposal decomposition failure: the
/// planner gets exactly one attempt at a well-formed document.
pub fn parse_proposal(raw: &str) -> QuorumResult<Proposal> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(QuorumError::decomposition(
            DecompositionReason::MalformedProposal,
            "planning reply was empty",
        ));
    }
    let proposal: Proposal = serde_json::from_str(body).map_err(|e| {
        QuorumError::decomposition(
            DecompositionReason::MalformedProposal,
            format!("planning reply is not a proposal document: {e}"),
        )
    })?;
    if proposal.subtasks.is_empty() {
        return Err(QuorumError::decomposition(
            DecompositionReason::MalformedProposal,
            "proposal contains no subtasks",
        ));
    }
    if let Some(blank) = proposal
        .subtasks
        .iter()
        .position(|s| s.description.trim().is_empty())
    {
        return Err(QuorumError::decomposition(
            DecompositionReason::MalformedProposal,
            format!("subtask {blank} has an empty description"),
        ));
    }
    Ok(proposal)
}

/// Parses a member reply into zero or more drafts.
///
/// A whitespace-only reply is the normal silent turn. Anything else must be
/// a JSON object or array carrying `to` and `content`; violations are
/// reasoning errors, which fail the invoking workspace.
pub fn parse_drafts(raw: &str) -> QuorumResult<Vec<Draft>> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| QuorumError::Reasoning(format!("reply is not valid JSON: {e}")))?;
    match value {
        serde_json::Value::Array(items) => items.iter().map(draft_from_value).collect(),
        obj @ serde_json::Value::Object(_) => Ok(vec![draft_from_value(&obj)?]),
        other => Err(QuorumError::Reasoning(format!(
            "reply must be a JSON object or array, got {other}"
        ))),
    }
}

fn draft_from_value(value: &serde_json::Value) -> QuorumResult<Draft> {
    let to = value
        .get("to")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| QuorumError::Reasoning("reply object is missing `to`".into()))?;
    let content = value
        .get("content")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| QuorumError::Reasoning("reply object is missing `content`".into()))?;
    let recipient = to
        .parse()
        .map_err(|e| QuorumError::Reasoning(format!("reply has a bad `to` address: {e}")))?;
    Ok(Draft {
        recipient,
        content: content.to_string(),
    })
}

/// A chat turn derived from the shared log, seen from the invoked
/// member's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTurn {
    /// True when the invoked member authored the underlying messages.
    pub own: bool,
    /// Rendered text; one or more coalesced log entries.
    pub text: String,
}

/// Renders the visible log as alternating chat turns.
///
/// Entries authored by `card` become assistant turns; everything else is a
/// user turn carrying a `from ... to ...` attribution header. Consecutive
/// same-author runs are coalesced, which keeps providers that insist on
/// strict user/assistant alternation happy.
pub fn render_log(card: &AgentCard, log: &[Message]) -> Vec<LogTurn> {
    let mut turns: Vec<LogTurn> = Vec::new();
    for msg in log {
        let own = msg.sender == card.name;
        let text = if own {
            format!("to {}:\n{}", msg.recipient, msg.content)
        } else {
            format!("from {} to {}:\n{}", msg.sender, msg.recipient, msg.content)
        };
        match turns.last_mut() {
            Some(last) if last.own == own => {
                last.text.push_str("\n\n");
                last.text.push_str(&text);
            }
            _ => turns.push(LogTurn { own, text }),
        }
    }
    turns
}

/// Removes a wrapping Markdown code fence, if present.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.rsplit_once("```") {
        Some((body, _)) => body.trim(),
        None => rest.trim(),
    }
}
