//! Prompt assembly from layers.
//!
//! The system prompt is rebuilt from an immutable base plus the instructions
//! of every active skill, so removing skills restores the base exactly.

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Tether, an autonomous assistant that completes tasks step by step \
using the tools available to you. When you need information or a decision that only the user can \
provide, call `ask_human`. When the task is complete, or cannot be completed, call `terminate`.";

pub const DEFAULT_NEXT_STEP_PROMPT: &str = "Based on the conversation so far, choose the most useful next action. \
Call a tool if it moves the task forward, and call `terminate` once the request is satisfied.";

pub const STUCK_ADVISORY: &str = "Observed duplicate responses. Consider new strategies and avoid repeating \
ineffective paths already attempted.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLayers {
    base: String,
    /// (skill name, instructions) in application order.
    skills: Vec<(String, String)>,
}

impl PromptLayers {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            skills: Vec::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Replace the base layer. Active skill layers are kept.
    pub fn set_base(&mut self, base: impl Into<String>) {
        self.base = base.into();
    }

    /// Add a skill layer. Returns `false` if the skill already has one.
    pub fn push_skill(&mut self, name: &str, instructions: String) -> bool {
        if self.has_skill(name) {
            return false;
        }
        self.skills.push((name.to_string(), instructions));
        true
    }

    pub fn remove_skill(&mut self, name: &str) -> bool {
        let before = self.skills.len();
        self.skills.retain(|(skill, _)| skill != name);
        before != self.skills.len()
    }

    pub fn clear_skills(&mut self) {
        self.skills.clear();
    }

    pub fn has_skill(&self, name: &str) -> bool {
        self.skills.iter().any(|(skill, _)| skill == name)
    }

    /// Base followed by each skill layer, separated by blank lines.
    pub fn system_prompt(&self) -> String {
        std::iter::once(self.base.as_str())
            .chain(self.skills.iter().map(|(_, text)| text.as_str()))
            .filter(|layer| !layer.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Next-step prompt with the stuck advisory prepended when needed.
pub fn assemble_next_step(next_step_prompt: &str, stuck: bool) -> String {
    match (stuck, next_step_prompt.is_empty()) {
        (false, _) => next_step_prompt.to_string(),
        (true, true) => STUCK_ADVISORY.to_string(),
        (true, false) => format!("{STUCK_ADVISORY}\n{next_step_prompt}"),
    }
}
