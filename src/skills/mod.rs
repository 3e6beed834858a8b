//! Skills: instruction bundles discovered from `SKILL.md` files and layered
//! onto an agent at runtime.

pub mod diagnostics;
pub mod frontmatter;
pub mod matcher;
pub mod model;
pub mod registry;

pub use diagnostics::{DiscoveryReport, SkillDiagnostic};
pub use matcher::SkillMatcher;
pub use model::{Skill, SkillMetadata};
pub use registry::SkillRegistry;
