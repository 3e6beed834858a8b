//! Tool trait and closure-based tool wrapper.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::types::AgentToolParameters;
use crate::error::Result;
use crate::llm::ToolDefinition;

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    pub tool_call_id: Option<String>,
    pub tool_name: Option<String>,
    /// Name of the agent running the tool.
    pub agent_name: Option<String>,
}

/// Output of a tool that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResult {
    pub output: Option<String>,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn output(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            output: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.output.as_deref().map_or(true, str::is_empty) && self.error.is_none()
    }
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, &self.output) {
            (Some(error), _) => write!(f, "Error: {error}"),
            (None, Some(output)) => f.write_str(output),
            (None, None) => Ok(()),
        }
    }
}

/// What a tool invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Completed(ToolResult),
    /// The tool cannot finish without a human answer to `question`.
    Suspend { question: String },
}

impl ToolOutcome {
    pub fn output(output: impl Into<String>) -> Self {
        Self::Completed(ToolResult::output(output))
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Completed(ToolResult::error(error))
    }

    pub fn suspend(question: impl Into<String>) -> Self {
        Self::Suspend {
            question: question.into(),
        }
    }
}

/// Core tool trait. Implement to expose an action to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &AgentToolParameters;

    /// Execute with parsed arguments.
    ///
    /// `Err` is a recoverable failure: the agent turns it into an error
    /// observation for the next step.
    async fn execute(&self, args: &ToolArguments, ctx: &ToolExecutionContext) -> Result<ToolOutcome>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().schema.clone(),
        }
    }
}

type ToolHandler = dyn Fn(ToolArguments, ToolExecutionContext) -> Pin<Box<dyn Future<Output = Result<ToolOutcome>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutcome>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(&self, args: &ToolArguments, ctx: &ToolExecutionContext) -> Result<ToolOutcome> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TetherError;
    use serde_json::json;

    #[test]
    fn error_results_display_with_prefix() {
        assert_eq!(ToolResult::error("boom").to_string(), "Error: boom");
        assert_eq!(ToolResult::output("ok").to_string(), "ok");
        assert!(ToolResult::default().is_empty());
    }

    #[tokio::test]
    async fn closure_tool_runs_handler() {
        let tool = AgentTool::new(
            "echo",
            "Echo the text argument",
            AgentToolParameters::object().string("text", "Text", true).build(),
            |args, _ctx| async move {
                let text = args.get_str("text")?.to_uppercase();
                Ok::<_, TetherError>(ToolOutcome::output(text))
            },
        );

        let outcome = tool
            .execute(&ToolArguments::new(json!({"text": "hi"})), &ToolExecutionContext::default())
            .await
            .unwrap();

        assert_eq!(outcome, ToolOutcome::output("HI"));
        assert_eq!(tool.definition().name, "echo");
    }
}
