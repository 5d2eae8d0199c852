//! Pluggable reasoning backends for the quorum engine.
//!
//! The engine consults a [`Reasoner`] every time a workspace member takes a
//! turn: the member's capability card plus its visible log go in, addressed
//! drafts come out. This crate provides the trait, hosted-API backends for
//! Anthropic and OpenAI-compatible providers, a deterministic scripted
//! backend for tests, and the retry and prompt plumbing they share.

/// Reasoning backends and the [`Reasoner`] trait.
pub mod backends;
/// Provider dispatch.
pub mod client;
/// Provider selection and connection settings.
pub mod config;
/// Prompt rendering and reply parsing.
pub mod protocol;
/// Transient-failure retries.
pub mod retry;

pub use backends::claude::ClaudeBackend;
pub use backends::openai::OpenAiBackend;
pub use backends::scripted::ScriptedBackend;
pub use backends::Reasoner;
pub use client::ReasonerClient;
pub use config::{ReasonerConfig, ReasonerProvider};
pub use retry::{RetryBackend, RetryPolicy};
