//! Agent system: lifecycle state, the budgeted step loop, and the
//! tool-calling step behaviour.

pub mod agent;
pub mod memory;
pub mod prompt;
pub mod state;
pub mod step;
pub mod toolcall;

pub use agent::{Agent, AgentConfig, RunOutcome, RunReport, SuspendedCall, SuspendedRun};
pub use memory::Memory;
pub use prompt::{PromptLayers, DEFAULT_NEXT_STEP_PROMPT, DEFAULT_SYSTEM_PROMPT, STUCK_ADVISORY};
pub use state::{AgentState, StateTransition, TransitionExit};
pub use step::{SandboxCleanup, StepBehavior, StepContext, StepOutcome, Suspension};
pub use toolcall::ToolCallStep;
