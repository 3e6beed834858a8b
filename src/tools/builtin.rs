//! Built-in control tools every agent carries.
//!
//! `terminate` is the only way a run reaches FINISHED; `ask_human` suspends
//! the run until a caller supplies an answer.

use std::sync::Arc;

use crate::error::TetherError;
use crate::tools::tool::{AgentTool, Tool, ToolOutcome};
use crate::tools::types::AgentToolParameters;

pub const TERMINATE: &str = "terminate";
pub const ASK_HUMAN: &str = "ask_human";

/// Create the `terminate` tool.
pub fn terminate_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        TERMINATE,
        "Terminate the interaction when the request is met OR if the assistant cannot proceed further with the task. \
         When you have finished all the tasks, call this tool to end the work.",
        AgentToolParameters::object()
            .string_enum(
                "status",
                "The finish status of the interaction.",
                &["success", "failure"],
                true,
            )
            .build(),
        |args, _ctx| async move {
            let status = args.get_str_opt("status").unwrap_or("success").to_string();
            Ok::<_, TetherError>(ToolOutcome::output(format!(
                "The interaction has been completed with status: {status}"
            )))
        },
    ))
}

/// Create the `ask_human` tool. Calling it suspends the run.
pub fn ask_human_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        ASK_HUMAN,
        "Ask the human a question and wait for the answer. Use it for approvals, \
         missing details, or choices only the user can make.",
        AgentToolParameters::object()
            .string("question", "The question to put to the human.", true)
            .build(),
        |args, _ctx| async move {
            let question = args.get_str("question")?.to_string();
            Ok::<_, TetherError>(ToolOutcome::suspend(question))
        },
    ))
}

/// Both control tools.
pub fn control_tools() -> Vec<Arc<dyn Tool>> {
    vec![terminate_tool(), ask_human_tool()]
}
