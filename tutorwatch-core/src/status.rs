//! Run lifecycle as seen by the monitor
//!
//! Transitions are driven by user control actions, by the settle timer after
//! a stop, and by the backend reporting that the run completed.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Process-wide status of the agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRunStatus {
    #[default]
    Idle,
    Running,
    Stopping,
}

impl AgentRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

impl std::fmt::Display for AgentRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guards [`AgentRunStatus`] transitions.
///
/// Each transition returns whether it was taken; an out-of-order request is
/// a no-op rather than an error.
#[derive(Debug, Clone, Default)]
pub struct RunStatusMachine {
    status: AgentRunStatus,
}

impl RunStatusMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> AgentRunStatus {
        self.status
    }

    /// idle -> running, taken optimistically before the start request.
    pub fn begin_start(&mut self) -> bool {
        self.transition(AgentRunStatus::Idle, AgentRunStatus::Running)
    }

    /// running -> idle when the start request failed.
    pub fn start_failed(&mut self) -> bool {
        self.transition(AgentRunStatus::Running, AgentRunStatus::Idle)
    }

    /// running -> stopping.
    pub fn begin_stop(&mut self) -> bool {
        self.transition(AgentRunStatus::Running, AgentRunStatus::Stopping)
    }

    /// stopping -> idle once late messages have had time to land.
    pub fn settle(&mut self) -> bool {
        self.transition(AgentRunStatus::Stopping, AgentRunStatus::Idle)
    }

    /// Any status -> idle because the backend finished every session.
    pub fn run_completed(&mut self) -> bool {
        let changed = self.status != AgentRunStatus::Idle;
        if changed {
            debug!(from = %self.status, "Run completed");
        }
        self.status = AgentRunStatus::Idle;
        changed
    }

    fn transition(&mut self, from: AgentRunStatus, to: AgentRunStatus) -> bool {
        if self.status != from {
            debug!(current = %self.status, requested = %to, "Ignoring status transition");
            return false;
        }
        debug!(from = %from, to = %to, "Run status changed");
        self.status = to;
        true
    }
}
