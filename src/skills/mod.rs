//! Skill System
//!
//! Capabilities the assistant can dispatch to. Native skills come from
//! provider plugins compiled into the binary; learned skills are shell
//! command templates taught at runtime, persisted, and reloaded at
//! startup.
//!
//! ```text
//! providers ──► SkillRegistry ◄── LearnedSkillStore (JSON)
//!                    │                    ▲
//!              catalog() / get()          │ persist-then-register
//!                    │                    │
//!               orchestrator ──► learn_terminal_skill
//! ```

pub mod builtin;
pub mod learning;
pub mod registry;
pub mod shell;
pub mod store;
pub mod template;
pub mod types;

pub use learning::{LearningProvider, LEARN_SKILL_NAME};
pub use registry::{SkillProvider, SkillRegistry};
pub use shell::{ShellConfig, ShellOutcome, ShellRunner};
pub use store::{LearnedSkillRecord, LearnedSkillStore, StoreError};
pub use template::{CommandTemplate, TemplateError};
pub use types::{
    ExecutionError, ParamMap, ParameterDefinition, ParameterType, Skill, SkillAction,
    SkillSummary, SkillValidationError,
};
