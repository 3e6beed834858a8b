//! Model client abstraction.
//!
//! The agent talks to a language model through [`ModelClient`]: a plain
//! completion (`ask`) used by the skill matcher, and a tool-calling turn
//! (`ask_tool`) used by the step loop.

pub mod openai_compatible;

pub use openai_compatible::OpenAiCompatibleClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Message, ToolCall};

/// JSON-schema description of a tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One request to the model.
#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    pub messages: Vec<Message>,
    /// System messages sent ahead of `messages`.
    pub system: Vec<Message>,
    pub temperature: Option<f64>,
    /// Per-request model override.
    pub model: Option<String>,
}

impl AskRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        let system = system.into();
        if !system.is_empty() {
            self.system.push(Message::system(system));
        }
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

/// Response to a tool-calling request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content,
            tool_calls,
        }
    }
}

/// A language model endpoint.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Plain completion. `None` when the model produced no text.
    async fn ask(&self, request: AskRequest) -> Result<Option<String>>;

    /// Completion that may request tool calls.
    async fn ask_tool(&self, request: AskRequest, tools: &[ToolDefinition]) -> Result<ModelTurn>;
}
