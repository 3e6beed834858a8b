//! Configuration system (layered: defaults > TOML file > environment).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Result, TetherError};

const CONFIG_FILE_NAME: &str = "tether.toml";

/// Top-level configuration for the engine and its front ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    pub agent: AgentSettings,
    pub skills: SkillSettings,
    pub sessions: SessionSettings,
    pub model: ModelSettings,
    pub logging: LoggingConfig,
}

/// Step loop configuration for each agent instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub name: String,
    pub max_steps: usize,
    pub duplicate_threshold: usize,
    /// Maximum characters of a tool observation kept in memory.
    pub max_observe: Option<usize>,
    pub system_prompt: Option<String>,
    pub next_step_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: "tether".to_string(),
            max_steps: 10,
            duplicate_threshold: 2,
            max_observe: None,
            system_prompt: None,
            next_step_prompt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillSettings {
    pub dir: PathBuf,
    pub enabled: bool,
}

impl Default for SkillSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("skills"),
            enabled: true,
        }
    }
}

/// Session store bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub capacity: usize,
    pub ttl_secs: u64,
    /// Wall-clock limit for one boundary call; `None` disables it.
    pub run_timeout_secs: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl_secs: 3600,
            run_timeout_secs: None,
        }
    }
}

/// OpenAI-compatible endpoint settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f64>,
}

impl std::fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: None,
        }
    }
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl TetherConfig {
    /// Resolve configuration from an explicit file (or the platform default),
    /// then apply environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|path| path.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            TetherError::Configuration(format!(
                "Unable to read config file '{}': {err}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply environment overrides using `lookup` as the variable source.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TETHER_MAX_STEPS") {
            self.agent.max_steps = parse_number("TETHER_MAX_STEPS", &value)?;
        }
        if let Some(value) = lookup("TETHER_DUPLICATE_THRESHOLD") {
            self.agent.duplicate_threshold = parse_number("TETHER_DUPLICATE_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("TETHER_SKILLS_DIR") {
            self.skills.dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("TETHER_MODEL") {
            self.model.model = value;
        }
        if let Some(value) = lookup("OPENAI_API_KEY") {
            self.model.api_key = Some(value);
        }
        if let Some(value) = lookup("OPENAI_BASE_URL") {
            self.model.base_url = value;
        }
        if let Some(value) = lookup("TETHER_LOG_LEVEL") {
            self.logging.level = value;
        }
        Ok(())
    }

    /// Reject settings that would break loop or store invariants.
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_steps == 0 {
            return Err(TetherError::Configuration(
                "agent.max_steps must be greater than 0".into(),
            ));
        }
        if self.agent.duplicate_threshold == 0 {
            return Err(TetherError::Configuration(
                "agent.duplicate_threshold must be at least 1".into(),
            ));
        }
        if self.sessions.capacity == 0 {
            return Err(TetherError::Configuration(
                "sessions.capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// `tether.toml` inside the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tether")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        TetherError::Configuration(format!("{key} must be a positive integer, got '{value}'"))
    })
}
