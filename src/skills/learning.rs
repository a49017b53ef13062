//! Terminal-Skill Learning
//!
//! The skill that teaches the assistant new skills. It is registered
//! and resolved like any other; its action validates the proposed
//! command template, persists a record, then registers a live skill so
//! the new capability is usable without a restart.
//!
//! Ordering is persist-then-register: if the store write fails nothing
//! is registered and the failure is surfaced as the skill's result.
//! Re-learning an existing name requires an explicit `overwrite` — never
//! silent.

use crate::skills::registry::{synthesize_learned_skill, SkillProvider, SkillRegistry};
use crate::skills::shell::ShellRunner;
use crate::skills::store::{LearnedSkillRecord, LearnedSkillStore};
use crate::skills::template::CommandTemplate;
use crate::skills::types::{ExecutionError, ParamMap, ParameterDefinition, Skill, SkillAction};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub const LEARN_SKILL_NAME: &str = "learn_terminal_skill";

/// Provider for the learning skill itself.
pub struct LearningProvider {
    registry: Arc<RwLock<SkillRegistry>>,
    store: LearnedSkillStore,
    runner: Arc<ShellRunner>,
}

impl LearningProvider {
    pub fn new(
        registry: Arc<RwLock<SkillRegistry>>,
        store: LearnedSkillStore,
        runner: Arc<ShellRunner>,
    ) -> Self {
        Self {
            registry,
            store,
            runner,
        }
    }
}

impl SkillProvider for LearningProvider {
    fn name(&self) -> &'static str {
        "learning"
    }

    fn skills(&self) -> anyhow::Result<Vec<Skill>> {
        let action = LearnTerminalSkill {
            registry: self.registry.clone(),
            store: self.store.clone(),
            runner: self.runner.clone(),
        };
        let skill = Skill::new(
            LEARN_SKILL_NAME,
            "Teaches the assistant a new terminal command it can run later. Provide a unique \
             name for the new skill (letters, digits and underscores only), a clear description \
             of what it does, the shell command template with '{{placeholder}}' markers for the \
             dynamic parts, and the list of those placeholder names. Set 'overwrite' to true \
             only when deliberately replacing a previously learned skill.",
            vec![
                ParameterDefinition::string(
                    "new_skill_name",
                    "Unique name for the new skill, e.g. 'make_project_folder'. Letters, digits \
                     and underscores only.",
                    true,
                ),
                ParameterDefinition::string(
                    "new_skill_description",
                    "What the new skill does and when to use it.",
                    true,
                ),
                ParameterDefinition::string(
                    "shell_command_template",
                    "The full terminal command, with '{{placeholder_name}}' markers for values \
                     supplied at run time, e.g. 'mkdir \"{{dir_name}}\"'.",
                    true,
                ),
                ParameterDefinition::list(
                    "template_parameters",
                    "The exact placeholder names used in the template, e.g. ['dir_name']. An \
                     empty list if the command has no placeholders.",
                    true,
                ),
                ParameterDefinition::boolean(
                    "overwrite",
                    "Set to true to replace an already learned skill with the same name.",
                    false,
                ),
            ],
            Arc::new(action),
        )?;
        Ok(vec![skill])
    }
}

/// Action behind `learn_terminal_skill`.
struct LearnTerminalSkill {
    registry: Arc<RwLock<SkillRegistry>>,
    store: LearnedSkillStore,
    runner: Arc<ShellRunner>,
}

#[async_trait]
impl SkillAction for LearnTerminalSkill {
    async fn run(&self, params: &ParamMap) -> Result<String, ExecutionError> {
        // Validation failures are the skill's result, not a fault.
        let (record, overwrite) = match parse_request(params) {
            Ok(parsed) => parsed,
            Err(reason) => return Ok(format!("I could not learn that skill: {reason}")),
        };

        if let Err(e) = CommandTemplate::new(&record.shell_command_template)
            .validate_parameters(&record.template_parameters)
        {
            return Ok(format!(
                "I could not learn '{}': {e}. Template: '{}', declared parameters: {:?}.",
                record.name, record.shell_command_template, record.template_parameters
            ));
        }

        let already_learned = self
            .store
            .contains(&record.name)
            .map_err(|e| ExecutionError::Failed(e.to_string()))?;
        if already_learned && !overwrite {
            return Ok(format!(
                "I already know a learned skill named '{}'. Ask me again and say it should \
                 be overwritten if you want to replace it.",
                record.name
            ));
        }

        let shadows_native = !already_learned && {
            let registry = self.registry.read().await;
            registry.get(&record.name).is_some()
        };

        // Persist first; only a durable skill becomes a live one.
        self.store
            .upsert(&record)
            .map_err(|e| ExecutionError::Failed(format!("could not save the new skill: {e}")))?;

        let skill = synthesize_learned_skill(&record, self.runner.clone())
            .map_err(|e| ExecutionError::Failed(format!("could not activate the new skill: {e}")))?;
        self.registry.write().await.register(skill);

        info!(skill = %record.name, overwrite, "learned new terminal skill");

        let mut confirmation = format!(
            "Learned the new terminal skill '{}'. You can use it right away.",
            record.name
        );
        if already_learned {
            confirmation.push_str(" It replaces the previous skill with that name.");
        } else if shadows_native {
            confirmation.push_str(" It shadows a built-in skill of the same name.");
        }
        Ok(confirmation)
    }
}

fn parse_request(params: &ParamMap) -> Result<(LearnedSkillRecord, bool), String> {
    let name = require_string(params, "new_skill_name")?;
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!(
            "'{name}' is not a valid skill name; use only letters, digits and underscores"
        ));
    }
    let description = require_string(params, "new_skill_description")?;
    let template = require_string(params, "shell_command_template")?;
    let template_parameters = parameter_list(params)?;
    let overwrite = match params.get("overwrite") {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(other) => {
            return Err(format!("'overwrite' must be true or false, got {other}"));
        }
    };

    Ok((
        LearnedSkillRecord {
            name,
            description,
            shell_command_template: template,
            template_parameters,
            learned_at: Utc::now(),
        },
        overwrite,
    ))
}

fn require_string(params: &ParamMap, key: &str) -> Result<String, String> {
    match params.get(key) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(serde_json::Value::String(_)) => Err(format!("'{key}' must not be empty")),
        Some(other) => Err(format!("'{key}' must be a string, got {other}")),
        None => Err(format!("'{key}' is required")),
    }
}

fn parameter_list(params: &ParamMap) -> Result<Vec<String>, String> {
    let value = params
        .get("template_parameters")
        .ok_or_else(|| "'template_parameters' is required (an empty list is fine)".to_string())?;
    let items = value
        .as_array()
        .ok_or_else(|| "'template_parameters' must be a list of placeholder names".to_string())?;
    let mut names = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str() {
            Some(s) if !s.trim().is_empty() => names.push(s.trim().to_string()),
            _ => {
                return Err(
                    "'template_parameters' must contain only non-empty strings".to_string()
                )
            }
        }
    }
    names.sort();
    names.dedup();
    Ok(names)
}
