//! The agent: lifecycle state, budgeted step loop, suspend/resume, and skills.

use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use tracing::{debug, info, warn};

use super::memory::Memory;
use super::prompt::{assemble_next_step, PromptLayers, DEFAULT_NEXT_STEP_PROMPT, DEFAULT_SYSTEM_PROMPT};
use super::state::{AgentState, StateTransition, TransitionExit};
use super::step::{SandboxCleanup, StepBehavior, StepContext, StepOutcome, Suspension};
use crate::config::AgentSettings;
use crate::error::{Result, TetherError};
use crate::hooks::{HookContext, HookEvent, HookManager};
use crate::skills::{Skill, SkillMatcher, SkillRegistry};
use crate::types::{Message, ToolCall};
use crate::util::timeout::with_timeout;

/// Static configuration for one agent.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct AgentConfig {
    #[builder(into, default = String::from("tether"))]
    pub name: String,
    /// Step budget for one run. Must be greater than zero.
    #[builder(default = 10)]
    pub max_steps: usize,
    /// Earlier identical assistant responses needed to flag the agent as stuck.
    #[builder(default = 2)]
    pub duplicate_threshold: usize,
    #[builder(into, default = String::from(DEFAULT_SYSTEM_PROMPT))]
    pub system_prompt: String,
    #[builder(into, default = String::from(DEFAULT_NEXT_STEP_PROMPT))]
    pub next_step_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AgentConfig {
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            name: settings.name.clone(),
            max_steps: settings.max_steps,
            duplicate_threshold: settings.duplicate_threshold,
            system_prompt: settings
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            next_step_prompt: settings
                .next_step_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_NEXT_STEP_PROMPT.to_string()),
        }
    }

    /// Reject budgets the step loop cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(TetherError::Validation(format!(
                "Agent {}: max_steps must be greater than 0",
                self.name
            )));
        }
        if self.duplicate_threshold == 0 {
            return Err(TetherError::Validation(format!(
                "Agent {}: duplicate_threshold must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

/// The tool call a suspended agent is waiting to complete.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspendedCall {
    pub call: ToolCall,
    pub question: String,
}

/// Log of a run that left the loop without suspending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Step lines joined by newlines, or `"No steps executed"`.
    pub summary: String,
    pub steps: Vec<String>,
    /// Whether the terminate tool ended the run.
    pub finished: bool,
}

impl RunReport {
    fn new(steps: Vec<String>, finished: bool) -> Self {
        let summary = if steps.is_empty() {
            "No steps executed".to_string()
        } else {
            steps.join("\n")
        };
        Self {
            summary,
            steps,
            finished,
        }
    }
}

/// A run that stopped to wait for a human answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspendedRun {
    pub question: String,
    /// Step lines completed before the suspending step.
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunReport),
    Suspended(SuspendedRun),
}

impl RunOutcome {
    /// Summary for completed runs, the question for suspended ones.
    pub fn text(&self) -> &str {
        match self {
            Self::Completed(report) => &report.summary,
            Self::Suspended(run) => &run.question,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended(_))
    }
}

/// An LLM task agent.
///
/// All mutation goes through `&mut self`; share an agent across tasks behind
/// a mutex (see [`crate::session::SessionStore`]).
pub struct Agent {
    config: AgentConfig,
    state: AgentState,
    current_step: usize,
    memory: Memory,
    prompts: PromptLayers,
    stuck: bool,
    behavior: Arc<dyn StepBehavior>,
    hooks: HookManager,
    registry: Option<SkillRegistry>,
    matcher: Option<SkillMatcher>,
    skills_enabled: bool,
    active_skills: Vec<Arc<Skill>>,
    suspended_call: Option<SuspendedCall>,
    cleanup: Option<Arc<dyn SandboxCleanup>>,
}

impl Agent {
    pub fn new(config: AgentConfig, behavior: Arc<dyn StepBehavior>) -> Result<Self> {
        config.validate()?;
        let prompts = PromptLayers::new(config.system_prompt.clone());
        Ok(Self {
            config,
            state: AgentState::Idle,
            current_step: 0,
            memory: Memory::new(),
            prompts,
            stuck: false,
            behavior,
            hooks: HookManager::new(),
            registry: None,
            matcher: None,
            skills_enabled: false,
            active_skills: Vec::new(),
            suspended_call: None,
            cleanup: None,
        })
    }

    /// Attach a skill registry and matcher and enable matching at task start.
    pub fn with_skills(mut self, registry: SkillRegistry, matcher: SkillMatcher) -> Self {
        self.registry = Some(registry);
        self.matcher = Some(matcher);
        self.skills_enabled = true;
        self
    }

    pub fn with_cleanup(mut self, cleanup: Arc<dyn SandboxCleanup>) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn messages(&self) -> &[Message] {
        self.memory.messages()
    }

    /// Append a message to memory.
    pub fn update_memory(&mut self, message: Message) {
        self.memory.push(message);
    }

    /// Assembled system prompt: base plus active skill instructions.
    pub fn system_prompt(&self) -> String {
        self.prompts.system_prompt()
    }

    /// Replace the base system prompt. Active skills stay layered on top.
    pub fn set_base_system_prompt(&mut self, prompt: impl Into<String>) {
        self.prompts.set_base(prompt);
    }

    /// Next-step prompt as the next step will see it.
    pub fn next_step_prompt(&self) -> String {
        assemble_next_step(&self.config.next_step_prompt, self.stuck)
    }

    /// Whether the latest assistant response repeats earlier ones at least
    /// `duplicate_threshold` times.
    pub fn is_stuck(&self) -> bool {
        self.memory.repeated_assistant_responses() >= self.config.duplicate_threshold
    }

    pub fn suspended_call(&self) -> Option<&SuspendedCall> {
        self.suspended_call.as_ref()
    }

    pub fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookManager {
        &mut self.hooks
    }

    pub fn skill_registry(&self) -> Option<&SkillRegistry> {
        self.registry.as_ref()
    }

    pub fn skill_registry_mut(&mut self) -> Option<&mut SkillRegistry> {
        self.registry.as_mut()
    }

    pub fn enable_skills(&mut self) {
        self.skills_enabled = true;
    }

    pub fn disable_skills(&mut self) {
        self.skills_enabled = false;
    }

    pub fn skills_enabled(&self) -> bool {
        self.skills_enabled
    }

    pub fn active_skill_names(&self) -> Vec<&str> {
        self.active_skills.iter().map(|skill| skill.name()).collect()
    }

    /// Model override of the most recently applied skill that declares one.
    pub fn active_model(&self) -> Option<&str> {
        self.active_skills.iter().rev().find_map(|skill| skill.model())
    }

    /// Union of the tool lists declared by active skills. `None` when no
    /// active skill declares one.
    pub fn allowed_tools(&self) -> Option<Vec<String>> {
        let mut allowed: Option<Vec<String>> = None;
        for tools in self.active_skills.iter().filter_map(|skill| skill.allowed_tools()) {
            let list = allowed.get_or_insert_with(Vec::new);
            for tool in tools {
                if !list.contains(tool) {
                    list.push(tool.clone());
                }
            }
        }
        allowed
    }

    /// Layer a skill onto the agent. Returns `false` if it is already active.
    pub fn apply_skill(&mut self, skill: Arc<Skill>) -> bool {
        let name = skill.name().to_string();
        if !self.prompts.push_skill(&name, skill.full_instructions()) {
            debug!(agent = %self.config.name, skill = %name, "skill already active");
            return false;
        }
        if skill.has_hooks() {
            self.hooks.register_skill_hooks(&name, &skill.metadata.hooks);
        }
        if let Some(tools) = skill.allowed_tools() {
            debug!(skill = %name, allowed_tools = ?tools, "skill restricts tools");
        }
        self.active_skills.push(skill);
        info!(agent = %self.config.name, skill = %name, "applied skill");
        true
    }

    /// Remove one active skill, its prompt layer, and the hooks it registered.
    pub fn remove_skill(&mut self, name: &str) -> bool {
        if !self.active_skills.iter().any(|skill| skill.name() == name) {
            return false;
        }
        self.prompts.remove_skill(name);
        self.hooks.remove_owned_by(name);
        self.active_skills.retain(|skill| skill.name() != name);
        info!(agent = %self.config.name, skill = name, "removed skill");
        true
    }

    /// Remove every active skill.
    pub fn clear_skills(&mut self) {
        for skill in std::mem::take(&mut self.active_skills) {
            self.hooks.remove_owned_by(skill.name());
        }
        self.prompts.clear_skills();
        debug!(agent = %self.config.name, "cleared active skills");
    }

    /// Ask the matcher for a skill fitting `request` and apply it.
    ///
    /// Every failure is logged and reported as `false`.
    pub async fn match_and_apply_skill(&mut self, request: &str) -> bool {
        if !self.skills_enabled {
            return false;
        }
        let (Some(registry), Some(matcher)) = (self.registry.as_mut(), self.matcher.as_ref()) else {
            return false;
        };

        let available = registry.available();
        if available.is_empty() {
            debug!("no skills available for matching");
            return false;
        }
        let Some(name) = matcher.match_skill(request, &available).await else {
            debug!("no skill matched the request");
            return false;
        };
        match registry.ensure_loaded(&name) {
            Ok(skill) => self.apply_skill(skill),
            Err(err) => {
                warn!(skill = %name, error = %err, "matched skill failed to load");
                false
            }
        }
    }

    /// Run the step loop.
    ///
    /// `Some(input)` starts a new task: the input is appended as a user turn
    /// and the step counter restarts. `None` continues the current
    /// conversation, typically after [`Agent::resume`].
    pub async fn run(&mut self, input: Option<String>) -> Result<RunOutcome> {
        match self.state {
            AgentState::Running => {
                return Err(TetherError::InvalidState(format!(
                    "Agent {} is already running",
                    self.config.name
                )))
            }
            AgentState::Suspended => {
                return Err(TetherError::InvalidState(format!(
                    "Agent {} is waiting for an answer; call resume first",
                    self.config.name
                )))
            }
            _ => {}
        }

        match input {
            Some(input) => {
                self.state = AgentState::Idle;
                self.current_step = 0;
                self.stuck = false;
                self.memory.push(Message::user(input.clone()));
                self.match_and_apply_skill(&input).await;
            }
            None if self.memory.is_empty() => {
                return Err(TetherError::InvalidState(
                    "Nothing to continue: no input and empty memory".into(),
                ));
            }
            None => self.state = AgentState::Idle,
        }

        let transition = StateTransition::enter(&mut self.state, AgentState::Running);
        let result = self.step_loop().await;

        let how = match &result {
            Ok(RunOutcome::Suspended(run)) => {
                info!(agent = %self.config.name, question = %run.question, "agent suspended");
                TransitionExit::Suspended
            }
            Ok(RunOutcome::Completed(_)) => TransitionExit::Normal,
            Err(err) => {
                warn!(agent = %self.config.name, error = %err, "run failed");
                TransitionExit::Failed
            }
        };
        transition.exit(&mut self.state, how);
        if matches!(&result, Ok(RunOutcome::Completed(report)) if report.finished) {
            self.state = AgentState::Finished;
        }

        // Suspension keeps the run open: no cleanup and no stop hooks.
        if how != TransitionExit::Suspended {
            self.after_run(&result).await;
        }
        result
    }

    /// [`Agent::run`] bounded by a wall-clock limit. A timeout leaves the
    /// agent in `ERROR`.
    pub async fn run_with_timeout(&mut self, input: Option<String>, limit: Duration) -> Result<RunOutcome> {
        let result = with_timeout(limit, self.run(input)).await;
        if let Err(TetherError::Timeout(ms)) = &result {
            warn!(agent = %self.config.name, timeout_ms = *ms, "run timed out");
            self.state = AgentState::Error;
            self.after_run(&result).await;
        }
        result
    }

    /// Complete the pending tool call with `answer`.
    ///
    /// The answer becomes the tool result of the call that suspended, and
    /// the agent returns to `IDLE` so `run(None)` can continue.
    pub async fn resume(&mut self, answer: impl Into<String>) -> Result<()> {
        let Some(pending) = self.suspended_call.take() else {
            return Err(TetherError::NoPendingCall);
        };
        let answer = answer.into();

        self.memory.push(Message::tool_result(
            pending.call.id.clone(),
            pending.call.name.clone(),
            answer.clone(),
        ));
        let ctx = HookContext {
            tool_name: pending.call.name.clone(),
            tool_input: Some(pending.call.arguments.to_string()),
            result: Some(answer),
        };
        self.hooks.trigger(HookEvent::PostToolUse, &ctx).await;

        self.state = AgentState::Idle;
        info!(agent = %self.config.name, tool = %pending.call.name, "resumed suspended call");
        Ok(())
    }

    /// [`Agent::resume`] followed by `run(None)`.
    pub async fn resume_and_run(&mut self, answer: impl Into<String>) -> Result<RunOutcome> {
        self.resume(answer).await?;
        self.run(None).await
    }

    async fn step_loop(&mut self) -> Result<RunOutcome> {
        let mut steps = Vec::new();
        let max_steps = self.config.max_steps;
        let behavior = self.behavior.clone();

        while self.current_step < max_steps && self.state != AgentState::Finished {
            self.current_step += 1;
            info!(agent = %self.config.name, step = self.current_step, max_steps, "executing step");

            let mut ctx = StepContext {
                agent_name: &self.config.name,
                step: self.current_step,
                system_prompt: self.prompts.system_prompt(),
                next_step_prompt: assemble_next_step(&self.config.next_step_prompt, self.stuck),
                model: self.active_model().map(str::to_string),
                allowed_tools: self.allowed_tools(),
                memory: &mut self.memory,
                hooks: &mut self.hooks,
            };

            let summary = match behavior.step(&mut ctx).await? {
                StepOutcome::Continue(summary) => summary,
                StepOutcome::Finish(summary) => {
                    self.state = AgentState::Finished;
                    summary
                }
                StepOutcome::Suspend(Suspension { question, call }) => {
                    self.suspended_call = Some(SuspendedCall {
                        call,
                        question: question.clone(),
                    });
                    return Ok(RunOutcome::Suspended(SuspendedRun { question, steps }));
                }
            };

            self.stuck = self.is_stuck();
            if self.stuck {
                warn!(agent = %self.config.name, step = self.current_step, "duplicate responses detected");
            }
            steps.push(format!("Step {}: {}", self.current_step, summary));
        }

        let finished = self.state == AgentState::Finished;
        if !finished && self.current_step >= max_steps {
            self.current_step = 0;
            self.state = AgentState::Idle;
            steps.push(format!("Terminated: Reached max steps ({max_steps})"));
            info!(agent = %self.config.name, max_steps, "terminated: reached max steps");
        }

        Ok(RunOutcome::Completed(RunReport::new(steps, finished)))
    }

    /// Sandbox cleanup and `Stop` hooks for every non-suspended exit.
    async fn after_run(&mut self, result: &Result<RunOutcome>) {
        if let Some(cleanup) = &self.cleanup {
            if let Err(err) = cleanup.cleanup().await {
                warn!(agent = %self.config.name, error = %err, "sandbox cleanup failed");
            }
        }

        let result = match result {
            Ok(outcome) => outcome.text().to_string(),
            Err(err) => format!("Error: {err}"),
        };
        let ctx = HookContext {
            tool_name: self.config.name.clone(),
            tool_input: None,
            result: Some(result),
        };
        self.hooks.trigger(HookEvent::Stop, &ctx).await;
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.config.name)
            .field("state", &self.state)
            .field("current_step", &self.current_step)
            .field("messages", &self.memory.len())
            .field("active_skills", &self.active_skill_names())
            .field("suspended", &self.suspended_call.is_some())
            .finish()
    }
}
