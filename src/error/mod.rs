//! Error types for Tether.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all Tether operations.
///
/// Suspension for human input is deliberately absent: a step that needs an
/// answer returns [`crate::agent::StepOutcome::Suspend`], so generic error
/// handling can never swallow it.
#[derive(Error, Debug)]
pub enum TetherError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("No pending tool call to resume")]
    NoPendingCall,

    #[error("Session {0} is busy with another request")]
    SessionBusy(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl TetherError {
    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) | Self::Toml(_) => ErrorCategory::Configuration,
            Self::Validation(_) | Self::Yaml(_) => ErrorCategory::Validation,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::InvalidState(_) | Self::NoPendingCall | Self::SessionBusy(_) => {
                ErrorCategory::AgentState
            }
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        if matches!(self, Self::SessionBusy(_)) {
            return RecoverySuggestion::WaitForSession;
        }
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server => {
                RecoverySuggestion::RetryWithBackoff
            }
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Validation => RecoverySuggestion::FixSkillDefinition,
            ErrorCategory::AgentState => RecoverySuggestion::SubmitNewTask,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TetherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_codes_map_to_categories() {
        assert_eq!(
            TetherError::Api { status: 401, message: "no".into() }.category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            TetherError::Api { status: 429, message: "slow".into() }.category(),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            TetherError::Api { status: 503, message: "down".into() }.category(),
            ErrorCategory::Server
        );
        assert_eq!(
            TetherError::Api { status: 400, message: "bad".into() }.category(),
            ErrorCategory::Api
        );
    }

    #[test]
    fn timeouts_are_retryable_but_state_errors_are_not() {
        assert!(TetherError::Timeout(100).is_retryable());
        assert!(!TetherError::NoPendingCall.is_retryable());
        assert!(!TetherError::InvalidState("busy".into()).is_retryable());
    }

    #[test]
    fn busy_sessions_suggest_waiting() {
        assert_eq!(
            TetherError::SessionBusy("abc".into()).recovery_suggestion(),
            RecoverySuggestion::WaitForSession
        );
        assert_eq!(
            TetherError::Validation("bad name".into()).recovery_suggestion(),
            RecoverySuggestion::FixSkillDefinition
        );
    }

    #[test]
    fn tool_helper_formats_message() {
        let err = TetherError::tool("web_search", "rate limited");
        assert_eq!(
            err.to_string(),
            "Tool execution error: web_search: rate limited"
        );
    }
}
