//! Addresses, drafts, and sequenced workspace messages.

use crate::error::QuorumError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Reserved address literal denoting the submitting user.
///
/// Also used as the sender name on task briefings distributed when a
/// workspace starts.
pub const USER: &str = "USER";

/// Sender name stamped on delivery-failure notices appended by the router.
pub const ROUTER: &str = "router";

/// A delivery target inside a workspace.
///
/// `name@role` addresses a member agent; the literal `USER` addresses the
/// submitting user and marks the carrying message as a terminal report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// The submitting user.
    User,
    /// A member agent.
    Agent {
        /// Registered agent name; the routing key.
        name: String,
        /// Role tag; carried for display and prompts, not for routing.
        role: String,
    },
}

impl Address {
    /// Builds an agent address from name and role parts.
    pub fn agent(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self::Agent {
            name: name.into(),
            role: role.into(),
        }
    }

    /// The member name this address routes to, or `None` for `USER`.
    pub fn member_name(&self) -> Option<&str> {
        match self {
            Self::User => None,
            Self::Agent { name, .. } => Some(name),
        }
    }

    /// True when this address targets the submitting user.
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str(USER),
            Self::Agent { name, role } => write!(f, "{name}@{role}"),
        }
    }
}

impl FromStr for Address {
    type Err = QuorumError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw == USER {
            return Ok(Self::User);
        }
        match raw.split_once('@') {
            Some((name, role)) if !name.is_empty() && !role.is_empty() && !role.contains('@') => {
                Ok(Self::agent(name, role))
            }
            _ => Err(QuorumError::Address(format!(
                "expected `name@role` or `USER`, got `{raw}`"
            ))),
        }
    }
}

// Addresses serialize as their canonical string form so transcripts read
// the same way the wire protocol does.
impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An addressed message body produced by a reasoning backend.
///
/// Drafts carry no sequence number or timestamp; the router assigns both
/// when a draft is accepted into a workspace log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Where the message should be delivered.
    pub recipient: Address,
    /// The message body.
    pub content: String,
}

impl Draft {
    /// Creates a draft addressed to a member agent.
    pub fn to_agent(
        name: impl Into<String>,
        role: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            recipient: Address::agent(name, role),
            content: content.into(),
        }
    }

    /// Creates a draft addressed to the submitting user.
    pub fn to_user(content: impl Into<String>) -> Self {
        Self {
            recipient: Address::User,
            content: content.into(),
        }
    }
}

/// A single record in a workspace's shared ordered log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    pub id: Uuid,
    /// Name of the producing member, or a pseudo-sender constant.
    pub sender: String,
    /// Where the message was delivered.
    pub recipient: Address,
    /// The textual content of the message.
    pub content: String,
    /// Position in the workspace log; strictly increasing from 1.
    pub seq: u64,
    /// UTC timestamp of when the router accepted the message.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Seals a draft into a log record with the given sender and sequence.
    pub fn sealed(sender: impl Into<String>, draft: Draft, seq: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            recipient: draft.recipient,
            content: draft.content,
            seq,
            sent_at: Utc::now(),
        }
    }

    /// True when this message is addressed to the submitting user.
    pub fn is_terminal(&self) -> bool {
        self.recipient.is_user()
    }
}
