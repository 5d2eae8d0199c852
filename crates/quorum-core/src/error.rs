//! Unified error handling for the quorum engine.

use std::fmt;

/// Why a task decomposition attempt was rejected.
///
/// Planning is all-or-nothing: it either yields a fully staffed task tree
/// or fails with one of these reasons before any workspace exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecompositionReason {
    /// The agent registry was empty when planning started.
    NoAgentsAvailable,
    /// A subtask could not be staffed with at least two capable agents.
    CapabilityMismatch,
    /// The decomposition proposal was missing, empty, or unparseable.
    MalformedProposal,
}

impl fmt::Display for DecompositionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NoAgentsAvailable => "no agents available",
            Self::CapabilityMismatch => "capability mismatch",
            Self::MalformedProposal => "malformed proposal",
        };
        f.write_str(label)
    }
}

/// Top-level error type for the quorum engine.
///
/// Each variant corresponds to a subsystem or failure category that can
/// surface through the public API.
#[derive(Debug, thiserror::Error)]
pub enum QuorumError {
    /// Task planning failed; no workspaces were created.
    #[error("decomposition failed ({reason}): {detail}")]
    Decomposition {
        /// The category of planning failure.
        reason: DecompositionReason,
        /// Context naming the offending subtask or input.
        detail: String,
    },

    /// A workspace was created against a parent missing from the arena.
    #[error("orphan workspace: {0}")]
    OrphanWorkspace(String),

    /// A message named a recipient outside the sending workspace.
    #[error("unknown recipient: {0}")]
    UnknownRecipient(String),

    /// An address literal did not match `name@role` or `USER`.
    #[error("invalid address: {0}")]
    Address(String),

    /// A reasoning backend failed to produce usable output.
    #[error("reasoning error: {0}")]
    Reasoning(String),

    /// An error from an outbound HTTP request (e.g. LLM API call).
    #[error("HTTP error: {0}")]
    Http(String),

    /// An error in configuration parsing or validation.
    #[error("config error: {0}")]
    Config(String),

    /// A scheduling or workspace bookkeeping invariant was broken.
    #[error("engine error: {0}")]
    Engine(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuorumError {
    /// Builds a [`QuorumError::Decomposition`] with the given reason.
    pub fn decomposition(reason: DecompositionReason, detail: impl Into<String>) -> Self {
        Self::Decomposition {
            reason,
            detail: detail.into(),
        }
    }

    /// True when this is a planning failure with the expected reason.
    pub fn is_decomposition(&self, expected: DecompositionReason) -> bool {
        matches!(self, Self::Decomposition { reason, .. } if *reason == expected)
    }
}

/// A convenience `Result` alias using [`QuorumError`].
pub type QuorumResult<T> = Result<T, QuorumError>;
