//! Skill discovery and lazy loading.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use super::diagnostics::{DiscoveryReport, SkillDiagnostic};
use super::frontmatter::{parse_metadata, parse_skill, SKILL_FILE_NAME};
use super::model::{Skill, SkillMetadata};
use crate::error::{Result, TetherError};

/// Discovers skills under one directory and caches what it has parsed.
///
/// Discovery reads only headers; [`SkillRegistry::load`] parses the full
/// instructions on first use and caches the result until unloaded.
#[derive(Debug)]
pub struct SkillRegistry {
    skills_dir: PathBuf,
    metadata: BTreeMap<String, SkillMetadata>,
    loaded: HashMap<String, Arc<Skill>>,
}

impl SkillRegistry {
    pub fn new(skills_dir: impl Into<PathBuf>) -> Self {
        let skills_dir = skills_dir.into();
        info!(dir = %skills_dir.display(), "skill registry initialized");
        Self {
            skills_dir,
            metadata: BTreeMap::new(),
            loaded: HashMap::new(),
        }
    }

    pub fn skills_dir(&self) -> &Path {
        &self.skills_dir
    }

    /// Scan immediate subdirectories that contain `SKILL.md` and cache their
    /// metadata. A skill that fails to parse is reported and skipped.
    pub fn discover(&mut self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        if !self.skills_dir.is_dir() {
            warn!(dir = %self.skills_dir.display(), "skills directory does not exist");
            return report;
        }

        for skill_dir in self.skill_directories() {
            match parse_metadata(&skill_dir) {
                Ok(metadata) => {
                    debug!(skill = %metadata.name, "discovered skill");
                    self.metadata.insert(metadata.name.clone(), metadata.clone());
                    report.discovered.push(metadata);
                }
                Err(err) => {
                    warn!(path = %skill_dir.display(), error = %err, "failed to discover skill");
                    report.failures.push(SkillDiagnostic {
                        path: skill_dir,
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            discovered = report.discovered.len(),
            failed = report.failures.len(),
            skills = ?report.names(),
            "skill discovery finished"
        );
        report
    }

    /// Load the full skill, using the cache when possible.
    pub fn load(&mut self, name: &str) -> Result<Arc<Skill>> {
        if let Some(skill) = self.loaded.get(name) {
            return Ok(skill.clone());
        }
        if !self.metadata.contains_key(name) {
            return Err(TetherError::Validation(format!("Skill not found: {name}")));
        }

        let skill_dir = self
            .skill_directories()
            .into_iter()
            .find(|dir| dir_name_lowercase(dir).as_deref() == Some(name))
            .ok_or_else(|| TetherError::Validation(format!("Skill directory not found: {name}")))?;

        let skill = Arc::new(parse_skill(&skill_dir)?);
        self.loaded.insert(name.to_string(), skill.clone());
        info!(skill = name, "loaded skill");
        Ok(skill)
    }

    /// Alias of [`SkillRegistry::load`] kept for call sites that read better
    /// as "make sure it is loaded".
    pub fn ensure_loaded(&mut self, name: &str) -> Result<Arc<Skill>> {
        self.load(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Drop the cached full skill. Metadata stays discovered.
    pub fn unload(&mut self, name: &str) -> bool {
        let removed = self.loaded.remove(name).is_some();
        if removed {
            info!(skill = name, "unloaded skill");
        }
        removed
    }

    /// Invalidate caches for `name`, rediscover, and load it again from disk.
    pub fn reload(&mut self, name: &str) -> Result<Arc<Skill>> {
        self.unload(name);
        self.metadata.remove(name);
        self.discover();
        self.load(name)
    }

    pub fn metadata(&self, name: &str) -> Option<&SkillMetadata> {
        self.metadata.get(name)
    }

    /// All discovered metadata, ordered by name.
    pub fn available(&self) -> Vec<SkillMetadata> {
        self.metadata.values().cloned().collect()
    }

    /// Name to description for every discovered skill.
    pub fn list(&self) -> BTreeMap<String, String> {
        self.metadata
            .iter()
            .map(|(name, meta)| (name.clone(), meta.description.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Immediate subdirectories holding a `SKILL.md`, sorted by name.
    /// Hidden and git-ignored entries are skipped.
    fn skill_directories(&self) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(&self.skills_dir);
        builder
            .max_depth(Some(2))
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .follow_links(true);

        let mut dirs: Vec<PathBuf> = builder
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(dir = %self.skills_dir.display(), error = %err, "failed while scanning for skills");
                    None
                }
            })
            .filter(|entry| {
                entry.depth() == 2
                    && entry.file_name() == OsStr::new(SKILL_FILE_NAME)
                    && entry.file_type().is_some_and(|kind| kind.is_file())
            })
            .filter_map(|entry| entry.path().parent().map(Path::to_path_buf))
            .collect();
        dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        dirs
    }
}

fn dir_name_lowercase(dir: &Path) -> Option<String> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn write_skill(root: &Path, dir: &str, body: &str) {
        let skill_dir = root.join(dir);
        fs::create_dir_all(&skill_dir).unwrap();
        fs::write(skill_dir.join(SKILL_FILE_NAME), body).unwrap();
    }

    #[test]
    fn missing_directory_discovers_nothing() {
        let root = tempdir().unwrap();
        let mut registry = SkillRegistry::new(root.path().join("nope"));
        let report = registry.discover();
        assert!(report.discovered.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn nested_and_hidden_skill_files_are_ignored() {
        let root = tempdir().unwrap();
        write_skill(root.path(), "top", "---\nname: top\ndescription: Top\n---\n");
        write_skill(root.path(), "top/nested", "---\nname: nested\ndescription: Nested\n---\n");
        write_skill(root.path(), ".hidden", "---\nname: hidden\ndescription: Hidden\n---\n");
        fs::create_dir_all(root.path().join("no-skill-file")).unwrap();

        let mut registry = SkillRegistry::new(root.path());
        let report = registry.discover();

        assert_eq!(report.names(), vec!["top"]);
    }

    #[test]
    fn load_is_cached_until_unloaded() {
        let root = tempdir().unwrap();
        write_skill(root.path(), "alpha", "---\nname: alpha\ndescription: A\n---\nFirst\n");
        let mut registry = SkillRegistry::new(root.path());
        registry.discover();

        let first = registry.load("alpha").unwrap();
        write_skill(root.path(), "alpha", "---\nname: alpha\ndescription: A\n---\nSecond\n");
        let cached = registry.ensure_loaded("alpha").unwrap();
        assert!(Arc::ptr_eq(&first, &cached));
        assert_eq!(cached.content, "First");

        assert!(registry.unload("alpha"));
        assert!(!registry.unload("alpha"));
        assert_eq!(registry.load("alpha").unwrap().content, "Second");
    }

    #[test]
    fn reload_picks_up_metadata_changes() {
        let root = tempdir().unwrap();
        write_skill(root.path(), "alpha", "---\nname: alpha\ndescription: Old\n---\nBody\n");
        let mut registry = SkillRegistry::new(root.path());
        registry.discover();
        registry.load("alpha").unwrap();

        write_skill(root.path(), "alpha", "---\nname: alpha\ndescription: New\n---\nBody\n");
        let skill = registry.reload("alpha").unwrap();

        assert_eq!(skill.metadata.description, "New");
        assert_eq!(registry.list()["alpha"], "New");
    }

    #[test]
    fn undiscovered_skill_cannot_be_loaded() {
        let root = tempdir().unwrap();
        let mut registry = SkillRegistry::new(root.path());
        assert!(matches!(registry.load("ghost"), Err(TetherError::Validation(_))));
    }
}
