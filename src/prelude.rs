//! Convenience re-exports for common use.

pub use crate::agent::{Agent, AgentConfig, AgentState, RunOutcome, StepBehavior, ToolCallStep};
pub use crate::config::TetherConfig;
pub use crate::error::{Result, TetherError};
pub use crate::hooks::{Hook, HookContext, HookEvent, HookManager};
pub use crate::llm::{ModelClient, OpenAiCompatibleClient};
pub use crate::session::{ChatRequest, ChatResponse, ChatStatus, SessionService, SessionStore};
pub use crate::skills::{Skill, SkillMatcher, SkillRegistry};
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments, ToolCollection, ToolOutcome};
pub use crate::types::{Message, Role, ToolCall};
