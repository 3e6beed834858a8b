//! Shared test helpers and a scripted model.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use tether::agent::{Agent, AgentConfig, ToolCallStep};
use tether::error::{Result, TetherError};
use tether::llm::{AskRequest, ModelClient, ModelTurn, ToolDefinition};
use tether::tools::builtin::control_tools;
use tether::tools::ToolCollection;
use tether::types::ToolCall;

/// A model that replays queued turns and records every request.
#[derive(Default)]
pub struct MockModel {
    turns: Mutex<VecDeque<ModelTurn>>,
    answers: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<AskRequest>>,
}

impl MockModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a plain text turn.
    pub fn queue_text(&self, text: &str) {
        self.turns.lock().unwrap().push_back(ModelTurn::text(text));
    }

    /// Queue a turn with a single tool call.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: Value) {
        self.turns
            .lock()
            .unwrap()
            .push_back(ModelTurn::with_tool_calls(None, vec![call(id, name, args)]));
    }

    pub fn queue_turn(&self, turn: ModelTurn) {
        self.turns.lock().unwrap().push_back(turn);
    }

    /// Queue an answer for `ask` (used by the skill matcher).
    pub fn queue_answer(&self, answer: &str) {
        self.answers.lock().unwrap().push_back(answer.to_string());
    }

    pub fn requests(&self) -> Vec<AskRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining_turns(&self) -> usize {
        self.turns.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for MockModel {
    async fn ask(&self, request: AskRequest) -> Result<Option<String>> {
        self.requests.lock().unwrap().push(request);
        Ok(self.answers.lock().unwrap().pop_front())
    }

    async fn ask_tool(&self, request: AskRequest, _tools: &[ToolDefinition]) -> Result<ModelTurn> {
        self.requests.lock().unwrap().push(request);
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TetherError::Model("no scripted turn left".into()))
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

/// Agent with the control tools, backed by `model`.
pub fn tool_agent(model: Arc<MockModel>, max_steps: usize) -> Agent {
    let step = ToolCallStep::new(model, ToolCollection::from_tools(control_tools()));
    Agent::new(
        AgentConfig::builder()
            .name("test-agent")
            .max_steps(max_steps)
            .system_prompt("You are a test agent.")
            .build(),
        Arc::new(step),
    )
    .unwrap()
}

/// Write `<root>/<dir>/SKILL.md` with the given header and body.
pub fn write_skill(root: &Path, dir: &str, header: &str, body: &str) {
    let skill_dir = root.join(dir);
    std::fs::create_dir_all(&skill_dir).unwrap();
    std::fs::write(skill_dir.join("SKILL.md"), format!("---\n{header}\n---\n{body}")).unwrap();
}
