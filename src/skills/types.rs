//! Skill Type Definitions
//!
//! Core data structures for the skill system: parameter metadata, the
//! skill descriptor itself, the catalog projection handed to the
//! reasoning engine, and the execution error taxonomy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Parameter values as extracted by the reasoning engine.
pub type ParamMap = HashMap<String, serde_json::Value>;

/// Parameter types
///
/// Descriptive metadata for the reasoning engine; not enforced at call
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    List,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::List => "list",
        }
    }
}

/// One accepted input to a skill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Parameter name as it appears in the engine's parameter map
    pub name: String,
    /// Parameter type
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    /// Human-readable description, consumed by the resolver's prompt
    pub description: String,
    /// Is this parameter required?
    #[serde(default)]
    pub required: bool,
}

impl ParameterDefinition {
    /// Create a string parameter
    pub fn string(name: &str, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            param_type: ParameterType::String,
            description: description.to_string(),
            required,
        }
    }

    /// Create a boolean parameter
    pub fn boolean(name: &str, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            param_type: ParameterType::Boolean,
            description: description.to_string(),
            required,
        }
    }

    /// Create a list-of-strings parameter
    pub fn list(name: &str, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            param_type: ParameterType::List,
            description: description.to_string(),
            required,
        }
    }
}

/// Executable behavior behind a skill.
///
/// Implementations must be pure functions of the parameter map plus
/// ambient system state; they hold no reference to resolver internals.
#[async_trait]
pub trait SkillAction: Send + Sync {
    /// Run the action, returning a human-readable result string.
    async fn run(&self, params: &ParamMap) -> Result<String, ExecutionError>;
}

/// A named, described, parameterized unit of executable behavior.
#[derive(Clone)]
pub struct Skill {
    name: String,
    description_for_llm: String,
    parameters_expected: Vec<ParameterDefinition>,
    action: Arc<dyn SkillAction>,
}

impl Skill {
    /// Create a skill, validating its descriptor fields.
    pub fn new(
        name: &str,
        description_for_llm: &str,
        parameters_expected: Vec<ParameterDefinition>,
        action: Arc<dyn SkillAction>,
    ) -> Result<Self, SkillValidationError> {
        if name.trim().is_empty() {
            return Err(SkillValidationError::EmptyName);
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(SkillValidationError::InvalidName(name.to_string()));
        }
        if description_for_llm.trim().is_empty() {
            return Err(SkillValidationError::EmptyDescription(name.to_string()));
        }
        for param in &parameters_expected {
            if param.name.trim().is_empty() {
                return Err(SkillValidationError::InvalidParameter(name.to_string()));
            }
        }
        Ok(Self {
            name: name.to_string(),
            description_for_llm: description_for_llm.to_string(),
            parameters_expected,
            action,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description_for_llm(&self) -> &str {
        &self.description_for_llm
    }

    pub fn parameters_expected(&self) -> &[ParameterDefinition] {
        &self.parameters_expected
    }

    /// Names of parameters declared `required = true`.
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters_expected
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    /// True if `name` is one of this skill's declared parameters.
    pub fn declares_parameter(&self, name: &str) -> bool {
        self.parameters_expected.iter().any(|p| p.name == name)
    }

    /// Execute the skill's action with the provided parameters.
    pub async fn invoke(&self, params: &ParamMap) -> Result<String, ExecutionError> {
        self.action.run(params).await
    }

    /// The serializable projection handed to the reasoning engine.
    pub fn summary(&self) -> SkillSummary {
        SkillSummary {
            name: self.name.clone(),
            description_for_llm: self.description_for_llm.clone(),
            parameters_expected: self.parameters_expected.clone(),
        }
    }
}

impl fmt::Debug for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Skill")
            .field("name", &self.name)
            .field("parameters", &self.parameters_expected.len())
            .finish()
    }
}

/// Catalog row: a skill minus its action.
#[derive(Debug, Clone, Serialize)]
pub struct SkillSummary {
    pub name: String,
    pub description_for_llm: String,
    pub parameters_expected: Vec<ParameterDefinition>,
}

/// Skill descriptor validation errors
#[derive(Debug, thiserror::Error)]
pub enum SkillValidationError {
    #[error("skill name must not be empty")]
    EmptyName,

    #[error("invalid skill name '{0}': only letters, digits and underscores are allowed")]
    InvalidName(String),

    #[error("skill '{0}' has an empty description")]
    EmptyDescription(String),

    #[error("skill '{0}' declares a parameter with an empty name")]
    InvalidParameter(String),
}

/// Faults raised by a skill's action, caught at the orchestration
/// boundary and reported as a skill failure.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("value for parameter '{name}' contains characters not allowed in a shell command: {value:?}")]
    UnsafeValue { name: String, value: String },

    #[error("command blocked: {0}")]
    Blocked(String),

    #[error("command timed out after {0} seconds")]
    Timeout(u64),

    #[error("failed to launch process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAction;

    #[async_trait]
    impl SkillAction for EchoAction {
        async fn run(&self, params: &ParamMap) -> Result<String, ExecutionError> {
            let text = params
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or("nothing");
            Ok(format!("echoed {text}"))
        }
    }

    #[test]
    fn skill_rejects_empty_name() {
        let result = Skill::new("", "a description", Vec::new(), Arc::new(EchoAction));
        assert!(matches!(result, Err(SkillValidationError::EmptyName)));
    }

    #[test]
    fn skill_rejects_name_with_spaces() {
        let result = Skill::new("bad name", "a description", Vec::new(), Arc::new(EchoAction));
        assert!(matches!(result, Err(SkillValidationError::InvalidName(_))));
    }

    #[test]
    fn skill_rejects_empty_description() {
        let result = Skill::new("fine_name", "  ", Vec::new(), Arc::new(EchoAction));
        assert!(matches!(
            result,
            Err(SkillValidationError::EmptyDescription(_))
        ));
    }

    #[test]
    fn required_parameters_filters_optional() {
        let skill = Skill::new(
            "demo",
            "demo skill",
            vec![
                ParameterDefinition::string("a", "first", true),
                ParameterDefinition::string("b", "second", false),
            ],
            Arc::new(EchoAction),
        )
        .unwrap();

        let required: Vec<&str> = skill.required_parameters().collect();
        assert_eq!(required, vec!["a"]);
        assert!(skill.declares_parameter("b"));
        assert!(!skill.declares_parameter("c"));
    }

    #[tokio::test]
    async fn invoke_delegates_to_action() {
        let skill = Skill::new(
            "echo",
            "echoes text",
            vec![ParameterDefinition::string("text", "text to echo", true)],
            Arc::new(EchoAction),
        )
        .unwrap();

        let mut params = ParamMap::new();
        params.insert("text".into(), serde_json::json!("hello"));
        assert_eq!(skill.invoke(&params).await.unwrap(), "echoed hello");
    }

    #[test]
    fn summary_serializes_without_action() {
        let skill = Skill::new(
            "echo",
            "echoes text",
            vec![ParameterDefinition::string("text", "text to echo", true)],
            Arc::new(EchoAction),
        )
        .unwrap();

        let json = serde_json::to_value(skill.summary()).unwrap();
        assert_eq!(json["name"], "echo");
        assert_eq!(json["parameters_expected"][0]["type"], "string");
        assert_eq!(json["parameters_expected"][0]["required"], true);
    }
}
