//! Skill Registry
//!
//! Sole owner of the live skill collection. Native skills come from an
//! explicit list of provider plugins; learned skills are synthesized
//! from the durable store. Registration is last-write-wins by name, and
//! learned skills load after native ones so they may intentionally
//! shadow them.

use crate::skills::shell::ShellRunner;
use crate::skills::store::{LearnedSkillRecord, LearnedSkillStore};
use crate::skills::template::CommandTemplate;
use crate::skills::types::{
    ExecutionError, ParamMap, ParameterDefinition, Skill, SkillAction, SkillSummary,
    SkillValidationError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A native-skill plugin: a pure function returning its skills, called
/// explicitly by the registry. No module-load side effects.
pub trait SkillProvider: Send + Sync {
    /// Provider name, for load diagnostics.
    fn name(&self) -> &'static str;

    /// Build this provider's skills.
    fn skills(&self) -> anyhow::Result<Vec<Skill>>;
}

/// The live skill collection for the process lifetime.
#[derive(Default)]
pub struct SkillRegistry {
    skills: HashMap<String, Arc<Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by name. Last write wins.
    pub fn register(&mut self, skill: Skill) {
        let name = skill.name().to_string();
        if self.skills.insert(name.clone(), Arc::new(skill)).is_some() {
            info!(skill = %name, "replaced previously registered skill");
        }
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<Arc<Skill>> {
        self.skills.get(name).cloned()
    }

    /// The projection handed to the reasoning engine, name-sorted so the
    /// prompt is deterministic.
    pub fn catalog(&self) -> Vec<SkillSummary> {
        let mut summaries: Vec<SkillSummary> =
            self.skills.values().map(|s| s.summary()).collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Register every provider's skills. A failing provider is logged
    /// and skipped; one broken plugin never disables the rest. Returns
    /// the number of skills registered.
    pub fn load_native(&mut self, providers: &[Box<dyn SkillProvider>]) -> usize {
        let mut count = 0;
        for provider in providers {
            match provider.skills() {
                Ok(skills) => {
                    info!(provider = provider.name(), skills = skills.len(), "loaded skill provider");
                    for skill in skills {
                        self.register(skill);
                        count += 1;
                    }
                }
                Err(e) => {
                    error!(provider = provider.name(), error = %e, "skill provider failed to load");
                }
            }
        }
        count
    }

    /// Synthesize and register a live skill for every valid record in
    /// the store. Invalid records are skipped with a warning; an
    /// unreadable store degrades to zero learned skills. Returns the
    /// number of skills registered.
    pub fn load_learned(&mut self, store: &LearnedSkillStore, runner: &Arc<ShellRunner>) -> usize {
        let records = match store.load_all() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "could not read learned-skill store; continuing without learned skills");
                return 0;
            }
        };

        let mut count = 0;
        for record in records {
            match synthesize_learned_skill(&record, runner.clone()) {
                Ok(skill) => {
                    self.register(skill);
                    count += 1;
                }
                Err(e) => {
                    warn!(skill = %record.name, error = %e, "skipping invalid learned-skill record");
                }
            }
        }
        info!(skills = count, "loaded learned skills");
        count
    }
}

/// Build a live skill from a persisted record. The record's placeholder
/// invariant is re-checked here; load never trusts the file.
pub fn synthesize_learned_skill(
    record: &LearnedSkillRecord,
    runner: Arc<ShellRunner>,
) -> Result<Skill, SynthesisError> {
    record.validate()?;

    let template = CommandTemplate::new(&record.shell_command_template);
    let parameters = record
        .template_parameters
        .iter()
        .map(|name| {
            ParameterDefinition::string(
                name,
                &format!("Value substituted for the '{{{{{name}}}}}' placeholder."),
                true,
            )
        })
        .collect();

    let action = LearnedCommand { template, runner };
    Ok(Skill::new(
        &record.name,
        &record.description,
        parameters,
        Arc::new(action),
    )?)
}

/// Errors turning a stored record into a live skill.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Template(#[from] crate::skills::template::TemplateError),

    #[error(transparent)]
    Descriptor(#[from] SkillValidationError),
}

/// Action behind every learned skill: substitute, then run.
struct LearnedCommand {
    template: CommandTemplate,
    runner: Arc<ShellRunner>,
}

#[async_trait]
impl SkillAction for LearnedCommand {
    async fn run(&self, params: &ParamMap) -> Result<String, ExecutionError> {
        let command = self.template.render(params)?;
        let outcome = self.runner.run(&command).await?;
        Ok(outcome.describe())
    }
}
