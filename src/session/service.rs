//! Request/response boundary over the session store.
//!
//! A prompt for a suspended session is the answer to its pending question;
//! any other prompt starts a new task on the session's agent.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{info, warn};
use uuid::Uuid;

use super::SessionStore;
use crate::agent::{Agent, AgentConfig, AgentState, RunOutcome, ToolCallStep};
use crate::config::TetherConfig;
use crate::error::{Result, TetherError};
use crate::llm::ModelClient;
use crate::skills::{SkillMatcher, SkillRegistry};
use crate::tools::builtin::control_tools;
use crate::tools::ToolCollection;

/// Builds the agent for a new session.
pub type AgentFactory = Arc<dyn Fn() -> Result<Agent> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatStatus {
    Completed,
    Suspended,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Run summary, the pending question, or an error message.
    pub response: String,
    pub status: ChatStatus,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

impl ChatResponse {
    fn from_outcome(session_id: String, outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed(report) => Self {
                response: report.summary,
                status: ChatStatus::Completed,
                session_id,
                question: None,
            },
            RunOutcome::Suspended(run) => Self {
                response: run.question.clone(),
                status: ChatStatus::Suspended,
                session_id,
                question: Some(run.question),
            },
        }
    }

    fn error(session_id: String, err: &TetherError) -> Self {
        Self {
            response: format!("Error: {err}"),
            status: ChatStatus::Error,
            session_id,
            question: None,
        }
    }
}

/// Routes chat requests to session agents.
pub struct SessionService {
    store: Arc<SessionStore>,
    factory: AgentFactory,
    run_timeout: Option<Duration>,
}

impl SessionService {
    pub fn new(store: Arc<SessionStore>, factory: AgentFactory) -> Self {
        Self {
            store,
            factory,
            run_timeout: None,
        }
    }

    /// Service whose agents carry the control tools, talk to `client`, and
    /// match skills from the configured directory when skills are enabled.
    pub fn from_config(config: &TetherConfig, client: Arc<dyn ModelClient>) -> Self {
        let store = Arc::new(SessionStore::from_settings(&config.sessions));
        let agent_config = AgentConfig::from_settings(&config.agent);
        let max_observe = config.agent.max_observe;
        let skills = config.skills.clone();

        let factory: AgentFactory = Arc::new(move || {
            let step = ToolCallStep::new(client.clone(), ToolCollection::from_tools(control_tools()))
                .with_max_observe(max_observe);
            let agent = Agent::new(agent_config.clone(), Arc::new(step))?;
            if !skills.enabled {
                return Ok(agent);
            }
            let mut registry = SkillRegistry::new(skills.dir.clone());
            let report = registry.discover();
            for failure in &report.failures {
                warn!(path = %failure.path.display(), error = %failure.message, "skipped skill");
            }
            Ok(agent.with_skills(registry, SkillMatcher::new(client.clone())))
        });

        let timeout = config.sessions.run_timeout_secs.map(Duration::from_secs);
        Self::new(store, factory).with_run_timeout(timeout)
    }

    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Handle one request. Failures are reported in the response and the
    /// session is kept so the caller can retry.
    pub async fn chat(&self, request: ChatRequest) -> ChatResponse {
        let session_id = request
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        match self.handle(&session_id, request.prompt).await {
            Ok(outcome) => {
                info!(session_id = %session_id, suspended = outcome.is_suspended(), "chat handled");
                ChatResponse::from_outcome(session_id, outcome)
            }
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "chat failed");
                ChatResponse::error(session_id, &err)
            }
        }
    }

    async fn handle(&self, session_id: &str, prompt: String) -> Result<RunOutcome> {
        if prompt.trim().is_empty() && !self.store.contains(session_id).await {
            return Err(TetherError::InvalidArgument(
                "A prompt is required to start a session".into(),
            ));
        }

        let mut agent = self
            .store
            .get_or_insert_and_acquire(session_id, || (self.factory)())
            .await?;

        let input = if agent.state() == AgentState::Suspended {
            info!(session_id, "answering pending question");
            agent.resume(prompt).await?;
            None
        } else {
            Some(prompt)
        };

        match self.run_timeout {
            Some(limit) => agent.run_with_timeout(input, limit).await,
            None => agent.run(input).await,
        }
    }

    /// Drop every session.
    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}
