//! Knowledge Skills
//!
//! A small key-value fact base the user can add to by voice: "remember
//! that my wifi password is ...", "what is my wifi password?". Facts
//! live in one JSON file with the same atomic-rewrite discipline as the
//! learned-skill store.

use crate::skills::registry::SkillProvider;
use crate::skills::types::{ExecutionError, ParamMap, ParameterDefinition, Skill, SkillAction};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// JSON-file-backed fact base.
#[derive(Debug, Clone)]
pub struct FactStore {
    path: PathBuf,
}

impl FactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, ExecutionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(ExecutionError::Failed(format!(
                    "could not read the fact base: {e}"
                )))
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| ExecutionError::Failed(format!("the fact base is not valid JSON: {e}")))
    }

    fn save(&self, facts: &BTreeMap<String, String>) -> Result<(), ExecutionError> {
        let io_failure =
            |e: std::io::Error| ExecutionError::Failed(format!("could not save the fact base: {e}"));
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_failure)?;
            }
        }
        let json = serde_json::to_string_pretty(facts)
            .map_err(|e| ExecutionError::Failed(format!("could not encode the fact base: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_failure)?;
        std::fs::rename(&tmp, &self.path).map_err(io_failure)?;
        Ok(())
    }
}

/// Provider for the fact-base skills.
pub struct KnowledgeProvider {
    store: FactStore,
}

impl KnowledgeProvider {
    pub fn new(facts_path: impl Into<PathBuf>) -> Self {
        Self {
            store: FactStore::new(facts_path),
        }
    }
}

impl SkillProvider for KnowledgeProvider {
    fn name(&self) -> &'static str {
        "knowledge"
    }

    fn skills(&self) -> anyhow::Result<Vec<Skill>> {
        Ok(vec![
            Skill::new(
                "learn_fact",
                "Remembers a fact for the user as a key and a value, e.g. key 'my car', value \
                 'blue Corolla'. Use when the user asks the assistant to remember something.",
                vec![
                    ParameterDefinition::string(
                        "fact_key",
                        "Short name of the fact to remember, e.g. 'my car' or 'mom's birthday'.",
                        true,
                    ),
                    ParameterDefinition::string(
                        "fact_value",
                        "The information to associate with the key.",
                        true,
                    ),
                ],
                Arc::new(LearnFact {
                    store: self.store.clone(),
                }),
            )?,
            Skill::new(
                "recall_fact",
                "Recalls a fact previously stored with learn_fact, by its key. Use when the \
                 user asks what the assistant remembers about something.",
                vec![ParameterDefinition::string(
                    "fact_key",
                    "Name of the fact to recall.",
                    true,
                )],
                Arc::new(RecallFact {
                    store: self.store.clone(),
                }),
            )?,
        ])
    }
}

struct LearnFact {
    store: FactStore,
}

#[async_trait]
impl SkillAction for LearnFact {
    async fn run(&self, params: &ParamMap) -> Result<String, ExecutionError> {
        let key = string_param(params, "fact_key")?;
        let value = string_param(params, "fact_value")?;

        let mut facts = self.store.load()?;
        match facts.get(&key) {
            Some(existing) if *existing == value => {
                return Ok(format!("I already knew that '{key}' is '{value}'."));
            }
            Some(existing) => {
                let previous = existing.clone();
                facts.insert(key.clone(), value.clone());
                self.store.save(&facts)?;
                Ok(format!(
                    "Understood, '{key}' is now '{value}' (it was '{previous}')."
                ))
            }
            None => {
                facts.insert(key.clone(), value.clone());
                self.store.save(&facts)?;
                Ok(format!("Understood, I will remember that '{key}' is '{value}'."))
            }
        }
    }
}

struct RecallFact {
    store: FactStore,
}

#[async_trait]
impl SkillAction for RecallFact {
    async fn run(&self, params: &ParamMap) -> Result<String, ExecutionError> {
        let key = string_param(params, "fact_key")?;
        let facts = self.store.load()?;

        if let Some(value) = facts.get(&key) {
            return Ok(format!("'{key}' is '{value}'."));
        }
        // Case-insensitive fallback for spoken keys.
        for (stored_key, value) in &facts {
            if stored_key.eq_ignore_ascii_case(&key) {
                return Ok(format!("'{stored_key}' is '{value}'."));
            }
        }
        Ok(format!("I do not have anything stored for '{key}'."))
    }
}

fn string_param(params: &ParamMap, key: &str) -> Result<String, ExecutionError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ExecutionError::MissingParameter(key.to_string()))
}
