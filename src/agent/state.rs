//! Agent lifecycle states and the scoped transition used by the run loop.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Agent lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    /// Ready to accept a task.
    #[default]
    Idle,
    /// Inside the step loop.
    Running,
    /// Waiting for a human answer to a pending tool call.
    Suspended,
    /// The terminate tool was invoked.
    Finished,
    /// The last run failed.
    Error,
}

impl AgentState {
    /// States from which a new task may start.
    pub fn accepts_new_task(self) -> bool {
        matches!(self, Self::Idle | Self::Finished | Self::Error)
    }
}

/// How a guarded section ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionExit {
    Normal,
    Suspended,
    Failed,
}

/// Scoped state transition.
///
/// Entering records the previous state. Leaving normally restores it,
/// a failure leaves `Error`, and a suspension leaves `Suspended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a transition must be closed with `exit`"]
pub struct StateTransition {
    previous: AgentState,
}

impl StateTransition {
    pub fn enter(state: &mut AgentState, next: AgentState) -> Self {
        let previous = std::mem::replace(state, next);
        Self { previous }
    }

    pub fn previous(&self) -> AgentState {
        self.previous
    }

    pub fn exit(self, state: &mut AgentState, how: TransitionExit) {
        *state = match how {
            TransitionExit::Normal => self.previous,
            TransitionExit::Suspended => AgentState::Suspended,
            TransitionExit::Failed => AgentState::Error,
        };
    }
}
