//! Native Skill Providers
//!
//! Code-defined skills shipped with the assistant, each behind the
//! explicit [`SkillProvider`](crate::skills::SkillProvider) plugin
//! interface.

pub mod knowledge;
pub mod system;
pub mod web;

pub use knowledge::KnowledgeProvider;
pub use system::SystemProvider;
pub use web::WebProvider;
