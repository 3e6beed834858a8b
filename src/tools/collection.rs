//! Ordered set of tools available to an agent.

use std::sync::Arc;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolExecutionContext, ToolOutcome};
use crate::error::{Result, TetherError};
use crate::llm::ToolDefinition;

/// Tools keyed by name, kept in registration order.
#[derive(Clone, Default)]
pub struct ToolCollection {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut collection = Self::new();
        for tool in tools {
            collection.add(tool);
        }
        collection
    }

    /// Add a tool, replacing any existing tool with the same name.
    pub fn add(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|existing| existing.name() == tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate `args` against the tool's schema, then run it.
    pub async fn execute(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<ToolOutcome> {
        let tool = self
            .get(name)
            .ok_or_else(|| TetherError::tool(name, format!("Unknown tool '{name}'")))?;
        tool.parameters()
            .validate(args.raw())
            .map_err(|message| TetherError::InvalidArgument(format!("{name}: {message}")))?;
        tool.execute(args, ctx).await
    }
}

impl std::fmt::Debug for ToolCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
