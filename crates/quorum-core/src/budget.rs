//! Run-level resource budgets.

use crate::error::{QuorumError, QuorumResult};
use serde::{Deserialize, Serialize};

fn default_max_agent_turns() -> u32 {
    8
}

fn default_max_cycles() -> u32 {
    12
}

fn default_max_events_per_cycle() -> u32 {
    16
}

/// Hard resource ceilings applied to one submitted task.
///
/// Budgets bound runaway agent conversations. Exceeding any ceiling moves
/// the affected workspace to `Exhausted`, a terminal status distinct from
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionBudget {
    /// Maximum reasoning turns any single member may take in one workspace.
    #[serde(default = "default_max_agent_turns")]
    pub max_agent_turns: u32,
    /// Maximum global scheduler cycles for the whole run.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,
    /// Maximum inbox events one workspace may drain in a single cycle.
    #[serde(default = "default_max_events_per_cycle")]
    pub max_events_per_cycle: u32,
}

impl Default for ExecutionBudget {
    fn default() -> Self {
        Self {
            max_agent_turns: default_max_agent_turns(),
            max_cycles: default_max_cycles(),
            max_events_per_cycle: default_max_events_per_cycle(),
        }
    }
}

impl ExecutionBudget {
    /// Creates a budget with the default ceilings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-member turn ceiling.
    pub fn with_max_agent_turns(mut self, turns: u32) -> Self {
        self.max_agent_turns = turns;
        self
    }

    /// Sets the scheduler cycle ceiling.
    pub fn with_max_cycles(mut self, cycles: u32) -> Self {
        self.max_cycles = cycles;
        self
    }

    /// Sets the per-workspace, per-cycle event ceiling.
    pub fn with_max_events_per_cycle(mut self, events: u32) -> Self {
        self.max_events_per_cycle = events;
        self
    }

    /// Rejects budgets with any zero ceiling.
    pub fn validate(&self) -> QuorumResult<()> {
        if self.max_agent_turns == 0 {
            return Err(QuorumError::Config(
                "max_agent_turns must be at least 1".into(),
            ));
        }
        if self.max_cycles == 0 {
            return Err(QuorumError::Config("max_cycles must be at least 1".into()));
        }
        if self.max_events_per_cycle == 0 {
            return Err(QuorumError::Config(
                "max_events_per_cycle must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
