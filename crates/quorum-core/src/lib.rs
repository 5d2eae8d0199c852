//! Shared vocabulary for the quorum task-decomposition engine.
//!
//! This crate provides the foundational types consumed by every quorum
//! crate: error handling, workspace addressing and messages, agent
//! capability cards, the process-wide registry, and execution budgets.
//!
//! # Main types
//!
//! - [`QuorumError`] — Unified error enum for all quorum subsystems.
//! - [`QuorumResult`] — Convenience alias for `Result<T, QuorumError>`.
//! - [`Address`] — A `name@role` or `USER` delivery target.
//! - [`Draft`] — An addressed message body awaiting routing.
//! - [`Message`] — A sequenced record in a workspace's shared log.
//! - [`AgentCard`] — Immutable capability descriptor for one agent.
//! - [`AgentRegistry`] — Process-wide name-to-card directory.
//! - [`ExecutionBudget`] — Hard resource ceilings for one submitted task.

/// Run-level resource budgets.
pub mod budget;
/// Agent capability cards.
pub mod card;
/// Unified error handling.
pub mod error;
/// Addresses, drafts, and sequenced messages.
pub mod message;
/// Process-wide agent registration.
pub mod registry;

pub use budget::ExecutionBudget;
pub use card::AgentCard;
pub use error::{DecompositionReason, QuorumError, QuorumResult};
pub use message::{Address, Draft, Message, ROUTER, USER};
pub use registry::{AgentRegistry, RegistrySnapshot};
