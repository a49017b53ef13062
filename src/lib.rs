//! Hark - Voice-Driven Command Dispatcher
//!
//! Listens for an activation phrase, captures a spoken command, asks a
//! reasoning engine to map the utterance onto one registered skill, and
//! executes it.
//!
//! # Features
//!
//! - **Skill Registry**: native skills from explicit provider plugins,
//!   learned skills from a persisted JSON store
//! - **Intent Resolution**: one utterance + the skill catalog in, one
//!   defensively parsed `{skill, parameters}` decision out
//! - **Skill Learning**: a skill that teaches new shell-command skills
//!   at runtime, validated and persisted before going live
//! - **Bounded Shell Execution**: timeouts, output caps, environment
//!   allowlist and destructive-pattern screening
//!
//! # Architecture
//!
//! ```text
//! capture ──► Orchestrator ──► IntentResolver ──► ReasoningEngine
//!                 │                  ▲
//!                 │              catalog()
//!                 ▼                  │
//!             SkillRegistry ◄── providers + LearnedSkillStore
//!                 │
//!                 ▼
//!          Skill::invoke ──► shell / HTTP / fact base
//! ```

pub mod capture;
pub mod config;
pub mod engine;
pub mod orchestrator;
pub mod resolver;
pub mod skills;

pub use capture::{CaptureSource, ConsoleCapture};
pub use config::Config;
pub use engine::{ClaudeEngine, EngineError, ReasoningEngine};
pub use orchestrator::{ConsoleReporter, Orchestrator, Reporter, TurnOutcome};
pub use resolver::{IntentResolver, Resolution, ResolveError};
pub use skills::{
    LearnedSkillRecord, LearnedSkillStore, LearningProvider, ParamMap, ParameterDefinition,
    Skill, SkillProvider, SkillRegistry, SkillSummary,
};
