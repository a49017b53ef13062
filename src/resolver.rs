//! Intent Resolution
//!
//! Turns one utterance plus the current skill catalog into a decision:
//! which skill to run and with which parameters. The engine's reply is
//! untrusted structured output — anything malformed, any unknown skill
//! name, any parameter outside the chosen skill's schema downgrades to
//! `NoMatch` with a diagnostic. There is no best-effort repair.

use crate::engine::{EngineError, ReasoningEngine};
use crate::skills::{ParamMap, SkillSummary};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// The no-match sentinel the engine is instructed to use.
const NONE_SENTINEL: &str = "none";

/// Outcome of resolving one utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Exactly one skill chosen, all required parameters present.
    Match { skill: String, params: ParamMap },
    /// A skill was chosen but required parameters are missing.
    NeedsClarification {
        skill: String,
        missing: Vec<String>,
    },
    /// Nothing usable; `diagnostic` says why when the reply was at fault.
    NoMatch { diagnostic: Option<String> },
}

/// Failures distinct from "no skill matched": the engine itself was
/// unreachable, timed out, or rejected the request.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// The reply shape the engine is instructed to produce.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EngineReply {
    chosen_skill: Option<String>,
    #[serde(default)]
    provided_parameters: ParamMap,
}

/// Maps utterances onto catalog skills via the reasoning engine.
pub struct IntentResolver {
    engine: Arc<dyn ReasoningEngine>,
}

impl IntentResolver {
    pub fn new(engine: Arc<dyn ReasoningEngine>) -> Self {
        Self { engine }
    }

    /// One request, one parse. No retries.
    pub async fn resolve(
        &self,
        utterance: &str,
        catalog: &[SkillSummary],
    ) -> Result<Resolution, ResolveError> {
        let prompt = build_prompt(utterance, catalog);
        let reply = self.engine.complete(&prompt).await?;
        debug!(reply = %reply, "engine reply");
        Ok(parse_reply(&reply, catalog))
    }
}

/// Catalog + utterance + response contract, in one prompt.
fn build_prompt(utterance: &str, catalog: &[SkillSummary]) -> String {
    // Catalog rows are plain serializable data; this cannot fail.
    let catalog_json =
        serde_json::to_string_pretty(catalog).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Decide which one of the available skills best satisfies the user's command, and extract any parameter values the command provides.

Available skills:
```json
{catalog_json}
```

User command: "{utterance}"

Reply with exactly one JSON object, no markdown and no extra text:
{{
  "chosen_skill": "<skill name, or \"{NONE_SENTINEL}\" if no skill fits>",
  "provided_parameters": {{ "<parameter name>": "<value>" }}
}}

Rules:
- Choose at most one skill, and only from the catalog above.
- Only include parameters that the chosen skill declares.
- Use "{NONE_SENTINEL}" when no skill fits; leave "provided_parameters" empty in that case."#
    )
}

/// Parse and validate the engine's reply against the catalog.
fn parse_reply(reply: &str, catalog: &[SkillSummary]) -> Resolution {
    let cleaned = strip_code_fences(reply);

    let parsed: EngineReply = match serde_json::from_str(cleaned) {
        Ok(parsed) => parsed,
        Err(e) => {
            return Resolution::NoMatch {
                diagnostic: Some(format!("engine reply was not the expected JSON shape: {e}")),
            }
        }
    };

    let chosen = match parsed.chosen_skill.as_deref().map(str::trim) {
        None | Some("") => return Resolution::NoMatch { diagnostic: None },
        Some(name) if name.eq_ignore_ascii_case(NONE_SENTINEL) => {
            return Resolution::NoMatch { diagnostic: None }
        }
        Some(name) => name,
    };

    let Some(summary) = catalog.iter().find(|s| s.name == chosen) else {
        return Resolution::NoMatch {
            diagnostic: Some(format!("engine chose unknown skill '{chosen}'")),
        };
    };

    for param in parsed.provided_parameters.keys() {
        if !summary.parameters_expected.iter().any(|p| &p.name == param) {
            return Resolution::NoMatch {
                diagnostic: Some(format!(
                    "engine supplied parameter '{param}' that skill '{chosen}' does not declare"
                )),
            };
        }
    }

    let missing: Vec<String> = summary
        .parameters_expected
        .iter()
        .filter(|p| p.required && !parsed.provided_parameters.contains_key(&p.name))
        .map(|p| p.name.clone())
        .collect();
    if !missing.is_empty() {
        return Resolution::NeedsClarification {
            skill: chosen.to_string(),
            missing,
        };
    }

    Resolution::Match {
        skill: chosen.to_string(),
        params: parsed.provided_parameters,
    }
}

/// Engines wrap JSON in ```json fences often enough to handle it here.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::ScriptedEngine;
    use crate::skills::ParameterDefinition;
    use serde_json::json;

    fn catalog() -> Vec<SkillSummary> {
        vec![
            SkillSummary {
                name: "open_application".to_string(),
                description_for_llm: "Opens an application.".to_string(),
                parameters_expected: vec![ParameterDefinition::string(
                    "app_name",
                    "Application to open.",
                    true,
                )],
            },
            SkillSummary {
                name: "tell_joke".to_string(),
                description_for_llm: "Tells a joke.".to_string(),
                parameters_expected: Vec::new(),
            },
        ]
    }

    fn resolver_with(reply: &str) -> IntentResolver {
        IntentResolver::new(Arc::new(ScriptedEngine::replying(reply)))
    }

    #[tokio::test]
    async fn well_formed_reply_resolves_to_match() {
        let resolver = resolver_with(
            r#"{"chosen_skill": "open_application", "provided_parameters": {"app_name": "calculator"}}"#,
        );
        let resolution = resolver.resolve("open the calculator", &catalog()).await.unwrap();
        match resolution {
            Resolution::Match { skill, params } => {
                assert_eq!(skill, "open_application");
                assert_eq!(params["app_name"], json!("calculator"));
            }
            other => panic!("expected Match, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fenced_reply_still_parses() {
        let resolver = resolver_with(
            "```json\n{\"chosen_skill\": \"tell_joke\", \"provided_parameters\": {}}\n```",
        );
        let resolution = resolver.resolve("tell me a joke", &catalog()).await.unwrap();
        assert!(matches!(resolution, Resolution::Match { skill, .. } if skill == "tell_joke"));
    }

    #[tokio::test]
    async fn none_sentinel_is_a_clean_no_match() {
        let resolver =
            resolver_with(r#"{"chosen_skill": "none", "provided_parameters": {}}"#);
        let resolution = resolver.resolve("what is the meaning of life", &catalog()).await.unwrap();
        assert_eq!(resolution, Resolution::NoMatch { diagnostic: None });
    }

    #[tokio::test]
    async fn null_skill_is_a_clean_no_match() {
        let resolver =
            resolver_with(r#"{"chosen_skill": null, "provided_parameters": {}}"#);
        let resolution = resolver.resolve("hmm", &catalog()).await.unwrap();
        assert_eq!(resolution, Resolution::NoMatch { diagnostic: None });
    }

    #[tokio::test]
    async fn unparseable_reply_is_no_match_with_diagnostic() {
        let resolver = resolver_with("I think you want the calculator!");
        let resolution = resolver.resolve("open the calculator", &catalog()).await.unwrap();
        assert!(
            matches!(resolution, Resolution::NoMatch { diagnostic: Some(d) } if d.contains("JSON"))
        );
    }

    #[tokio::test]
    async fn unknown_skill_name_is_no_match_with_diagnostic() {
        let resolver = resolver_with(
            r#"{"chosen_skill": "fly_to_the_moon", "provided_parameters": {}}"#,
        );
        let resolution = resolver.resolve("fly me to the moon", &catalog()).await.unwrap();
        assert!(matches!(
            resolution,
            Resolution::NoMatch { diagnostic: Some(d) } if d.contains("fly_to_the_moon")
        ));
    }

    #[tokio::test]
    async fn undeclared_parameter_is_no_match() {
        let resolver = resolver_with(
            r#"{"chosen_skill": "tell_joke", "provided_parameters": {"topic": "cats"}}"#,
        );
        let resolution = resolver.resolve("joke about cats", &catalog()).await.unwrap();
        assert!(matches!(
            resolution,
            Resolution::NoMatch { diagnostic: Some(d) } if d.contains("topic")
        ));
    }

    #[tokio::test]
    async fn missing_required_parameter_needs_clarification() {
        let resolver = resolver_with(
            r#"{"chosen_skill": "open_application", "provided_parameters": {}}"#,
        );
        let resolution = resolver.resolve("open something", &catalog()).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::NeedsClarification {
                skill: "open_application".to_string(),
                missing: vec!["app_name".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn extra_top_level_fields_are_malformed() {
        let resolver = resolver_with(
            r#"{"chosen_skill": "tell_joke", "provided_parameters": {}, "reasoning": "because"}"#,
        );
        let resolution = resolver.resolve("tell me a joke", &catalog()).await.unwrap();
        assert!(matches!(resolution, Resolution::NoMatch { diagnostic: Some(_) }));
    }

    #[tokio::test]
    async fn engine_failure_is_distinct_from_no_match() {
        let engine = ScriptedEngine::new(vec![Err(EngineError::Timeout(5))]);
        let resolver = IntentResolver::new(Arc::new(engine));
        let err = resolver.resolve("anything", &catalog()).await.unwrap_err();
        assert!(matches!(err, ResolveError::Engine(EngineError::Timeout(5))));
    }

    #[tokio::test]
    async fn prompt_contains_catalog_and_utterance() {
        let engine = Arc::new(ScriptedEngine::replying(
            r#"{"chosen_skill": "none", "provided_parameters": {}}"#,
        ));
        let resolver = IntentResolver::new(engine.clone());
        resolver.resolve("say something funny", &catalog()).await.unwrap();

        let prompts = engine.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("tell_joke"));
        assert!(prompts[0].contains("say something funny"));
        assert!(prompts[0].contains("chosen_skill"));
    }
}
