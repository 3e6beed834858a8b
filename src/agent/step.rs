//! The single-step contract between the run loop and a step behaviour.

use async_trait::async_trait;

use super::memory::Memory;
use crate::error::Result;
use crate::hooks::HookManager;
use crate::types::{Message, ToolCall};

/// A request for a human answer raised by a step.
#[derive(Debug, Clone, PartialEq)]
pub struct Suspension {
    pub question: String,
    /// The tool call whose result will be the answer.
    pub call: ToolCall,
}

/// Result of one step.
///
/// Suspension is a variant rather than an error so that no error path can
/// swallow it.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Step finished; carries a short summary for the run log.
    Continue(String),
    Suspend(Suspension),
    /// The task is complete.
    Finish(String),
}

/// Everything a step may read or change on its agent.
pub struct StepContext<'a> {
    pub agent_name: &'a str,
    /// 1-based index of this step within the run.
    pub step: usize,
    /// Assembled system prompt (base plus active skill layers).
    pub system_prompt: String,
    /// Assembled next-step prompt, including the stuck advisory if set.
    pub next_step_prompt: String,
    /// Model override from the most recently applied skill.
    pub model: Option<String>,
    /// Tools the active skills allow, or `None` when no skill restricts them.
    pub allowed_tools: Option<Vec<String>>,
    pub memory: &'a mut Memory,
    pub hooks: &'a mut HookManager,
}

impl StepContext<'_> {
    /// The only way a step adds to memory.
    pub fn remember(&mut self, message: Message) {
        self.memory.push(message);
    }
}

/// One reasoning and action cycle.
///
/// `Err` is an unrecoverable failure and moves the agent to `ERROR`;
/// recoverable model or tool failures should be recorded in memory instead.
#[async_trait]
pub trait StepBehavior: Send + Sync {
    async fn step(&self, ctx: &mut StepContext<'_>) -> Result<StepOutcome>;
}

/// Releases sandboxed side effects when a run exits without suspending.
#[async_trait]
pub trait SandboxCleanup: Send + Sync {
    async fn cleanup(&self) -> Result<()>;
}
