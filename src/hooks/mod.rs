//! Lifecycle hooks fired around tool use and at run stop.
//!
//! A hook matches a tool when its matcher is a case-insensitive substring of
//! the tool name. Matching hooks fire in registration order and a failing
//! hook never blocks the others or the tool call itself.

pub mod command;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Event that triggers a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum HookEvent {
    PreToolUse,
    PostToolUse,
    Stop,
}

/// Data handed to a hook when it fires.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HookContext {
    /// Tool name, or the agent name for `Stop`.
    pub tool_name: String,
    pub tool_input: Option<String>,
    pub result: Option<String>,
}

/// Async function hook.
pub type HookFn = Arc<dyn Fn(HookContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Clone)]
pub enum HookAction {
    Function(HookFn),
    /// Shell command template, see [`command`].
    Command(String),
}

impl fmt::Debug for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function(..)"),
            Self::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
        }
    }
}

/// Hook declaration as written in skill metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSpec {
    #[serde(default)]
    pub matcher: String,
    #[serde(rename = "type", default = "default_hook_type")]
    pub hook_type: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub once: bool,
}

fn default_hook_type() -> String {
    "function".to_string()
}

/// A registered hook.
#[derive(Debug, Clone)]
pub struct Hook {
    pub event: HookEvent,
    pub matcher: String,
    pub action: HookAction,
    pub once: bool,
    pub executed: bool,
    /// Skill that registered the hook, if any.
    pub owner: Option<String>,
}

impl Hook {
    pub fn new(event: HookEvent, matcher: impl Into<String>, action: HookAction) -> Self {
        Self {
            event,
            matcher: matcher.into(),
            action,
            once: false,
            executed: false,
            owner: None,
        }
    }

    pub fn function<F, Fut>(event: HookEvent, matcher: impl Into<String>, handler: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: HookFn = Arc::new(move |ctx| handler(ctx).boxed());
        Self::new(event, matcher, HookAction::Function(handler))
    }

    pub fn command(event: HookEvent, matcher: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(event, matcher, HookAction::Command(command.into()))
    }

    /// Fire at most once (after the first success).
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn owned_by(mut self, skill: impl Into<String>) -> Self {
        self.owner = Some(skill.into());
        self
    }

    pub fn matches(&self, event: HookEvent, tool_name: &str) -> bool {
        self.event == event && tool_name.to_lowercase().contains(&self.matcher.to_lowercase())
    }

    fn exhausted(&self) -> bool {
        self.once && self.executed
    }

    async fn run(&self, ctx: &HookContext) -> Result<()> {
        match &self.action {
            HookAction::Function(handler) => handler(ctx.clone()).await,
            HookAction::Command(template) => command::run_command(template, ctx).await,
        }
    }
}

/// Owns every hook registered on one agent.
#[derive(Debug, Default)]
pub struct HookManager {
    hooks: Vec<Hook>,
}

impl HookManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Hook) {
        debug!(event = %hook.event, matcher = %hook.matcher, owner = ?hook.owner, "registered hook");
        self.hooks.push(hook);
    }

    /// Register the hooks declared in a skill's metadata, owned by `skill`.
    ///
    /// Unknown events and `function` hooks (which need an in-process handler)
    /// are skipped with a warning.
    pub fn register_skill_hooks(&mut self, skill: &str, specs: &HashMap<String, Vec<HookSpec>>) -> usize {
        let mut registered = 0;
        let mut events: Vec<_> = specs.iter().collect();
        events.sort_by(|a, b| a.0.cmp(b.0));

        for (event_name, entries) in events {
            let Ok(event) = event_name.parse::<HookEvent>() else {
                warn!(skill, event = %event_name, "invalid hook event");
                continue;
            };
            for spec in entries {
                let command = match (spec.hook_type.as_str(), &spec.command) {
                    ("command", Some(command)) => command.clone(),
                    ("command", None) => {
                        warn!(skill, event = %event, "command hook without a command");
                        continue;
                    }
                    (other, _) => {
                        warn!(skill, event = %event, hook_type = other, "skipping hook without handler");
                        continue;
                    }
                };
                let mut hook = Hook::command(event, spec.matcher.clone(), command).owned_by(skill);
                hook.once = spec.once;
                self.register(hook);
                registered += 1;
                info!(skill, event = %event, matcher = %spec.matcher, "registered skill hook");
            }
        }
        registered
    }

    /// Fire every matching, non-exhausted hook. Returns how many succeeded.
    pub async fn trigger(&mut self, event: HookEvent, ctx: &HookContext) -> usize {
        let mut succeeded = 0;
        for hook in &mut self.hooks {
            if !hook.matches(event, &ctx.tool_name) || hook.exhausted() {
                continue;
            }
            match hook.run(ctx).await {
                Ok(()) => {
                    hook.executed = true;
                    succeeded += 1;
                    debug!(event = %event, matcher = %hook.matcher, "hook executed");
                }
                Err(err) => {
                    warn!(event = %event, matcher = %hook.matcher, error = %err, "hook failed");
                }
            }
        }
        succeeded
    }

    /// Drop every hook owned by `skill`.
    pub fn remove_owned_by(&mut self, skill: &str) -> usize {
        let before = self.hooks.len();
        self.hooks.retain(|hook| hook.owner.as_deref() != Some(skill));
        let removed = before - self.hooks.len();
        debug!(skill, removed, "removed skill hooks");
        removed
    }

    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    pub fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TetherError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_hook(event: HookEvent, matcher: &str, counter: Arc<AtomicUsize>) -> Hook {
        Hook::function(event, matcher, move |_ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), TetherError>(())
            }
        })
    }

    fn ctx(tool: &str) -> HookContext {
        HookContext {
            tool_name: tool.into(),
            ..HookContext::default()
        }
    }

    #[tokio::test]
    async fn matcher_is_case_insensitive_substring() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = HookManager::new();
        manager.register(counting_hook(HookEvent::PreToolUse, "Search", counter.clone()));

        manager.trigger(HookEvent::PreToolUse, &ctx("web_search")).await;
        manager.trigger(HookEvent::PreToolUse, &ctx("browser")).await;
        manager.trigger(HookEvent::PostToolUse, &ctx("web_search")).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_matcher_matches_everything() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = HookManager::new();
        manager.register(counting_hook(HookEvent::Stop, "", counter.clone()));

        manager.trigger(HookEvent::Stop, &ctx("any-agent")).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_hook_does_not_block_later_hooks_or_consume_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = HookManager::new();
        manager.register(
            Hook::function(HookEvent::PreToolUse, "tool", |_ctx| async {
                Err::<(), _>(TetherError::tool("hook", "boom"))
            })
            .once(),
        );
        manager.register(counting_hook(HookEvent::PreToolUse, "tool", counter.clone()));

        let succeeded = manager.trigger(HookEvent::PreToolUse, &ctx("tool")).await;

        assert_eq!(succeeded, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!manager.hooks()[0].executed);
    }

    #[test]
    fn removal_filters_by_exact_owner() {
        let mut manager = HookManager::new();
        manager.register(Hook::command(HookEvent::Stop, "", "true").owned_by("pdf"));
        manager.register(Hook::command(HookEvent::Stop, "", "true").owned_by("pdf-tools"));
        manager.register(Hook::command(HookEvent::Stop, "", "true"));

        assert_eq!(manager.remove_owned_by("pdf"), 1);
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.hooks()[0].owner.as_deref(), Some("pdf-tools"));
    }

    #[test]
    fn skill_specs_register_command_hooks_only() {
        let specs = HashMap::from([
            (
                "PreToolUse".to_string(),
                vec![
                    HookSpec {
                        matcher: "search".into(),
                        hook_type: "command".into(),
                        command: Some("true".into()),
                        once: true,
                    },
                    HookSpec {
                        matcher: "search".into(),
                        hook_type: "function".into(),
                        command: None,
                        once: false,
                    },
                ],
            ),
            ("NotAnEvent".to_string(), vec![]),
        ]);
        let mut manager = HookManager::new();

        assert_eq!(manager.register_skill_hooks("research", &specs), 1);
        let hook = &manager.hooks()[0];
        assert!(hook.once);
        assert_eq!(hook.owner.as_deref(), Some("research"));
        assert_eq!(hook.event, HookEvent::PreToolUse);
    }
}
