//! Tool-calling step: ask the model for tool calls, then run them.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::step::{StepBehavior, StepContext, StepOutcome, Suspension};
use crate::error::{Result, TetherError};
use crate::hooks::{HookContext, HookEvent};
use crate::llm::{AskRequest, ModelClient};
use crate::tools::builtin::{ASK_HUMAN, TERMINATE};
use crate::tools::{ToolArguments, ToolCollection, ToolExecutionContext, ToolOutcome};
use crate::types::{Message, ToolCall};
use crate::util::text::truncate_chars;

const CONTROL_TOOLS: [&str; 2] = [TERMINATE, ASK_HUMAN];

/// Step behaviour backed by a tool-calling model.
pub struct ToolCallStep {
    client: Arc<dyn ModelClient>,
    tools: ToolCollection,
    max_observe: Option<usize>,
}

impl ToolCallStep {
    pub fn new(client: Arc<dyn ModelClient>, tools: ToolCollection) -> Self {
        Self {
            client,
            tools,
            max_observe: None,
        }
    }

    /// Cap tool observations at `max_observe` characters.
    pub fn with_max_observe(mut self, max_observe: Option<usize>) -> Self {
        self.max_observe = max_observe;
        self
    }

    pub fn tools(&self) -> &ToolCollection {
        &self.tools
    }

    fn observe(&self, text: String) -> String {
        match self.max_observe {
            Some(limit) => truncate_chars(&text, limit),
            None => text,
        }
    }

    /// Run one call and turn the result into an observation, or return the
    /// suspension question.
    async fn act(&self, ctx: &mut StepContext<'_>, call: &ToolCall) -> std::result::Result<String, String> {
        let input = call.arguments.to_string();
        ctx.hooks
            .trigger(
                HookEvent::PreToolUse,
                &HookContext {
                    tool_name: call.name.clone(),
                    tool_input: Some(input.clone()),
                    result: None,
                },
            )
            .await;

        let exec_ctx = ToolExecutionContext {
            tool_call_id: Some(call.id.clone()),
            tool_name: Some(call.name.clone()),
            agent_name: Some(ctx.agent_name.to_string()),
        };
        let args = ToolArguments::new(call.arguments.clone());
        debug!(tool = %call.name, step = ctx.step, "executing tool");

        let outcome = if is_allowed(ctx.allowed_tools.as_deref(), &call.name) {
            self.tools.execute(&call.name, &args, &exec_ctx).await
        } else {
            Err(TetherError::tool(
                call.name.clone(),
                "Tool is not allowed by the active skills",
            ))
        };
        let observation = match outcome {
            Ok(ToolOutcome::Suspend { question }) => return Err(question),
            Ok(ToolOutcome::Completed(result)) if result.is_error() => result.to_string(),
            Ok(ToolOutcome::Completed(result)) if result.is_empty() => {
                format!("Cmd `{}` completed with no output", call.name)
            }
            Ok(ToolOutcome::Completed(result)) => {
                format!("Observed output of cmd `{}` executed:\n{result}", call.name)
            }
            Err(err) => {
                warn!(tool = %call.name, error = %err, "tool execution failed");
                format!("Error: {err}")
            }
        };
        let observation = self.observe(observation);

        ctx.hooks
            .trigger(
                HookEvent::PostToolUse,
                &HookContext {
                    tool_name: call.name.clone(),
                    tool_input: Some(input),
                    result: Some(observation.clone()),
                },
            )
            .await;
        Ok(observation)
    }
}

/// Control tools stay callable whatever the active skills allow.
fn is_allowed(allowed: Option<&[String]>, name: &str) -> bool {
    match allowed {
        None => true,
        Some(list) => CONTROL_TOOLS.contains(&name) || list.iter().any(|tool| tool == name),
    }
}

fn record_skipped(ctx: &mut StepContext<'_>, calls: &[ToolCall], reason: &str) {
    for call in calls {
        ctx.remember(Message::tool_result(
            call.id.clone(),
            call.name.clone(),
            format!("Error: Skipped because {reason}"),
        ));
    }
}

#[async_trait]
impl StepBehavior for ToolCallStep {
    async fn step(&self, ctx: &mut StepContext<'_>) -> Result<StepOutcome> {
        if !ctx.next_step_prompt.is_empty() {
            let prompt = ctx.next_step_prompt.clone();
            ctx.remember(Message::user(prompt));
        }

        let request = AskRequest::new(ctx.memory.messages().to_vec())
            .with_system(ctx.system_prompt.clone())
            .with_model(ctx.model.clone());
        let allowed = ctx.allowed_tools.as_deref();
        let definitions: Vec<_> = self
            .tools
            .definitions()
            .into_iter()
            .filter(|definition| is_allowed(allowed, &definition.name))
            .collect();

        let turn = match self.client.ask_tool(request, &definitions).await {
            Ok(turn) => turn,
            Err(err) => {
                warn!(agent = ctx.agent_name, step = ctx.step, error = %err, "model call failed");
                let text = format!("Error encountered while processing: {err}");
                ctx.remember(Message::assistant(text.clone()));
                return Ok(StepOutcome::Continue(text));
            }
        };

        let content = turn.content.unwrap_or_default();
        if turn.tool_calls.is_empty() {
            ctx.remember(Message::assistant(content.clone()));
            return Ok(StepOutcome::Continue(content));
        }

        info!(
            agent = ctx.agent_name,
            step = ctx.step,
            tools = ?turn.tool_calls.iter().map(|call| call.name.as_str()).collect::<Vec<_>>(),
            "model selected tools"
        );
        ctx.remember(Message::assistant_with_tool_calls(
            content,
            turn.tool_calls.clone(),
        ));

        let mut observations = Vec::with_capacity(turn.tool_calls.len());
        for (index, call) in turn.tool_calls.iter().enumerate() {
            let rest = &turn.tool_calls[index + 1..];
            match self.act(ctx, call).await {
                Ok(observation) => {
                    ctx.remember(Message::tool_result(
                        call.id.clone(),
                        call.name.clone(),
                        observation.clone(),
                    ));
                    observations.push(observation);
                    if call.name == TERMINATE {
                        record_skipped(ctx, rest, "the task was terminated");
                        info!(agent = ctx.agent_name, step = ctx.step, "task finished");
                        return Ok(StepOutcome::Finish(observations.join("\n\n")));
                    }
                }
                Err(question) => {
                    record_skipped(ctx, rest, "the agent is waiting for a human answer");
                    return Ok(StepOutcome::Suspend(Suspension {
                        question,
                        call: call.clone(),
                    }));
                }
            }
        }

        Ok(StepOutcome::Continue(observations.join("\n\n")))
    }
}
