//! Tool system for function calling.

pub mod arguments;
pub mod builtin;
pub mod collection;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use collection::ToolCollection;
pub use tool::{AgentTool, Tool, ToolExecutionContext, ToolOutcome, ToolResult};
pub use types::AgentToolParameters;
