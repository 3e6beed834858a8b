//! Data types describing a skill definition.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TetherError};
use crate::hooks::HookSpec;

pub const MAX_NAME_LEN: usize = 64;
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Metadata from a skill's YAML header. Cheap to discover, used for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMetadata {
    /// Lowercase name, always equal to the skill's directory name.
    pub name: String,
    pub description: String,
    /// Tools the skill may call while active. Control tools stay available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    /// Model to use while the skill is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default = "default_true")]
    pub user_invocable: bool,
    /// Event name (`PreToolUse`, `PostToolUse`, `Stop`) to hook declarations.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub hooks: HashMap<String, Vec<HookSpec>>,
}

fn default_true() -> bool {
    true
}

impl SkillMetadata {
    /// Check name and description limits.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.description.trim().is_empty() {
            return Err(TetherError::Validation(
                "Skill description must not be empty".into(),
            ));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(TetherError::Validation(format!(
                "Skill description must be {MAX_DESCRIPTION_LEN} characters or less"
            )));
        }
        Ok(())
    }

    pub fn has_hooks(&self) -> bool {
        self.hooks.values().any(|entries| !entries.is_empty())
    }
}

/// Name rules: 1 to 64 chars of `[a-z0-9_-]`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TetherError::Validation("Skill name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(TetherError::Validation(format!(
            "Skill name must be {MAX_NAME_LEN} characters or less"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(TetherError::Validation(format!(
            "Skill name '{name}' must only contain lowercase letters, numbers, and hyphens/underscores"
        )));
    }
    Ok(())
}

/// A fully loaded skill.
#[derive(Debug, Clone, PartialEq)]
pub struct Skill {
    pub metadata: SkillMetadata,
    /// Markdown instructions following the header.
    pub content: String,
    /// Skill directory.
    pub path: PathBuf,
    /// Markdown files linked from the instructions that exist in the skill directory.
    pub supporting_files: Vec<PathBuf>,
}

impl Skill {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Instructions as injected into the system prompt.
    pub fn full_instructions(&self) -> String {
        format!("# {}\n\n{}", self.metadata.name, self.content)
    }

    pub fn allowed_tools(&self) -> Option<&[String]> {
        self.metadata.allowed_tools.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.metadata.model.as_deref()
    }

    pub fn has_hooks(&self) -> bool {
        self.metadata.has_hooks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &str, description: &str) -> SkillMetadata {
        SkillMetadata {
            name: name.into(),
            description: description.into(),
            allowed_tools: None,
            model: None,
            context: None,
            user_invocable: true,
            hooks: HashMap::new(),
        }
    }

    #[test]
    fn names_allow_digits_hyphens_and_underscores() {
        assert!(metadata("pdf_tools-2", "ok").validate().is_ok());
    }

    #[test]
    fn names_reject_spaces_uppercase_and_overlong_values() {
        assert!(metadata("pdf tools", "ok").validate().is_err());
        assert!(metadata("PDF", "ok").validate().is_err());
        assert!(metadata(&"a".repeat(65), "ok").validate().is_err());
        assert!(metadata(&"a".repeat(64), "ok").validate().is_ok());
    }

    #[test]
    fn description_is_limited_to_1024_chars() {
        assert!(metadata("x", &"d".repeat(1024)).validate().is_ok());
        assert!(metadata("x", &"d".repeat(1025)).validate().is_err());
    }

    #[test]
    fn full_instructions_prefix_the_name_heading() {
        let skill = Skill {
            metadata: metadata("research", "Deep research"),
            content: "Cite sources.".into(),
            path: PathBuf::from("skills/research"),
            supporting_files: vec![],
        };
        assert_eq!(skill.full_instructions(), "# research\n\nCite sources.");
    }
}
