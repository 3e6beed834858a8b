//! `SKILL.md` parsing: YAML header plus markdown instructions.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::model::{Skill, SkillMetadata};
use crate::error::{Result, TetherError};
use crate::hooks::HookSpec;

pub const SKILL_FILE_NAME: &str = "SKILL.md";

static FRONTMATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)")
        .expect("frontmatter regex must compile")
});

static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+\.md)\)").expect("markdown link regex must compile")
});

#[derive(Debug, Deserialize)]
struct RawFrontmatter {
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "allowed-tools", alias = "allowed_tools")]
    allowed_tools: Option<ToolList>,
    model: Option<String>,
    context: Option<String>,
    #[serde(rename = "user-invocable", alias = "user_invocable")]
    user_invocable: Option<bool>,
    hooks: Option<HashMap<String, Vec<HookSpec>>>,
}

/// `allowed-tools` may be a YAML list or a comma separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ToolList {
    List(Vec<String>),
    Csv(String),
}

impl ToolList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(tools) => tools,
            Self::Csv(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|tool| !tool.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Split a skill file into its YAML header and markdown body.
pub fn split_frontmatter(content: &str) -> Result<(&str, &str)> {
    let captures = FRONTMATTER_RE.captures(content).ok_or_else(|| {
        TetherError::Validation(
            "Invalid SKILL.md format: YAML frontmatter must start with '---' on line 1".into(),
        )
    })?;
    let (Some(whole), Some(yaml)) = (captures.get(0), captures.get(1)) else {
        return Err(TetherError::Validation("Invalid SKILL.md frontmatter".into()));
    };
    Ok((yaml.as_str(), &content[whole.end()..]))
}

fn directory_name(skill_dir: &Path) -> Result<String> {
    skill_dir
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| {
            TetherError::Validation(format!(
                "Skill directory '{}' has no usable name",
                skill_dir.display()
            ))
        })
}

fn parse_metadata_from_str(skill_dir: &Path, yaml: &str) -> Result<SkillMetadata> {
    if yaml.trim().is_empty() {
        return Err(TetherError::Validation("SKILL.md frontmatter is empty".into()));
    }
    let raw: RawFrontmatter = serde_yaml::from_str(yaml)?;

    let (Some(_), Some(description)) = (raw.name, raw.description) else {
        return Err(TetherError::Validation(
            "SKILL.md must contain 'name' and 'description' fields in frontmatter".into(),
        ));
    };

    let metadata = SkillMetadata {
        name: directory_name(skill_dir)?,
        description,
        allowed_tools: raw.allowed_tools.map(ToolList::into_vec),
        model: raw.model,
        context: raw.context,
        user_invocable: raw.user_invocable.unwrap_or(true),
        hooks: raw.hooks.unwrap_or_default(),
    };
    metadata.validate()?;
    Ok(metadata)
}

fn read_skill_file(skill_dir: &Path) -> Result<String> {
    let path = skill_dir.join(SKILL_FILE_NAME);
    fs::read_to_string(&path).map_err(|err| {
        TetherError::Validation(format!("Unable to read {}: {err}", path.display()))
    })
}

/// Parse only the header of `<skill_dir>/SKILL.md`.
///
/// The declared `name` must be present but the directory name wins.
pub fn parse_metadata(skill_dir: &Path) -> Result<SkillMetadata> {
    let content = read_skill_file(skill_dir)?;
    let (yaml, _) = split_frontmatter(&content)?;
    parse_metadata_from_str(skill_dir, yaml)
}

/// Parse the full skill: header, instructions and supporting files.
pub fn parse_skill(skill_dir: &Path) -> Result<Skill> {
    let content = read_skill_file(skill_dir)?;
    let (yaml, body) = split_frontmatter(&content)?;
    let metadata = parse_metadata_from_str(skill_dir, yaml)?;

    Ok(Skill {
        metadata,
        supporting_files: supporting_files(body, skill_dir),
        content: body.trim().to_string(),
        path: skill_dir.to_path_buf(),
    })
}

/// Markdown files linked as `[text](file.md)` that exist inside the skill directory.
fn supporting_files(body: &str, skill_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for captures in MARKDOWN_LINK_RE.captures_iter(body) {
        let Some(target) = captures.get(2) else {
            continue;
        };
        let target = target.as_str();
        if target.contains("://") || target == SKILL_FILE_NAME {
            continue;
        }
        let path = skill_dir.join(target);
        if path.is_file() && !files.contains(&path) {
            files.push(path);
        }
    }
    files
}
