//! Diagnostics emitted while discovering skill definitions.

use std::path::PathBuf;

use super::model::SkillMetadata;

/// A skill directory that could not be discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDiagnostic {
    /// Directory holding the rejected `SKILL.md`.
    pub path: PathBuf,
    pub message: String,
}

/// Output of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Skills discovered in this pass, sorted by directory name.
    pub discovered: Vec<SkillMetadata>,
    /// One entry per skill directory that failed to parse or validate.
    pub failures: Vec<SkillDiagnostic>,
}

impl DiscoveryReport {
    pub fn names(&self) -> Vec<&str> {
        self.discovered.iter().map(|meta| meta.name.as_str()).collect()
    }
}
