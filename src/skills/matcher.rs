//! Model-backed selection of the skill that fits a request.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::model::SkillMetadata;
use crate::llm::{AskRequest, ModelClient};
use crate::types::Message;

/// Asks the model to pick at most one skill for a request.
///
/// Every failure mode (no skills, model error, unusable answer) resolves to
/// `None` so callers can always continue without a skill.
#[derive(Clone)]
pub struct SkillMatcher {
    client: Arc<dyn ModelClient>,
}

impl SkillMatcher {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    pub async fn match_skill(&self, request: &str, available: &[SkillMetadata]) -> Option<String> {
        if available.is_empty() {
            return None;
        }

        let prompt = build_prompt(request, available);
        let ask = AskRequest::new(vec![Message::user(prompt)]).with_temperature(0.0);

        match self.client.ask(ask).await {
            Ok(Some(answer)) => parse_answer(&answer, available),
            Ok(None) => {
                warn!("skill matcher received an empty answer");
                None
            }
            Err(err) => {
                warn!(error = %err, "skill matching failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for SkillMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillMatcher").finish_non_exhaustive()
    }
}

fn build_prompt(request: &str, available: &[SkillMetadata]) -> String {
    let skills = available
        .iter()
        .map(|skill| format!("- {}: {}", skill.name, skill.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a skill selector. Your task is to select the most relevant skill for a user request.\n\
         \n\
         Available skills:\n\
         {skills}\n\
         \n\
         User request: \"{request}\"\n\
         \n\
         Analyze the user request and select the skill that best matches their intent. Consider:\n\
         - What the user is asking for\n\
         - The skill's description and capabilities\n\
         - Keywords and phrases in both the request and descriptions\n\
         \n\
         Return ONLY the skill name (e.g., \"my-skill-name\"), or \"none\" if no skill is relevant.\n\
         Do not include any explanation or additional text."
    )
}

/// Normalise the model's answer and resolve it against known names:
/// exact match first, then substring containment either way.
fn parse_answer(answer: &str, available: &[SkillMetadata]) -> Option<String> {
    let candidate = answer
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_lowercase();

    if candidate.is_empty() || candidate == "none" || candidate == "no match" {
        return None;
    }

    let names: BTreeSet<String> = available.iter().map(|skill| skill.name.to_lowercase()).collect();
    if names.contains(&candidate) {
        debug!(skill = %candidate, "skill matched");
        return Some(candidate);
    }

    let fuzzy = names
        .iter()
        .find(|name| candidate.contains(name.as_str()) || name.contains(candidate.as_str()));
    match fuzzy {
        Some(name) => {
            debug!(skill = %name, answer = %candidate, "skill matched by containment");
            Some(name.clone())
        }
        None => {
            warn!(answer = %candidate, available = ?names, "model returned an unknown skill name");
            None
        }
    }
}
