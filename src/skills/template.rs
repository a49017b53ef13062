//! Shell Command Templates
//!
//! A learned skill's action is a command template with `{{name}}`
//! placeholders. Substitution is a validated, tagged-data step: the set
//! of placeholders must match the declared parameter list exactly, and
//! substituted values are screened for shell metacharacters before they
//! ever touch a command string.

use crate::skills::types::{ExecutionError, ParamMap};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap());

/// Characters that end a value's life as plain data.
const FORBIDDEN_VALUE_CHARS: &[char] = &[
    ';', '|', '&', '$', '`', '\\', '(', ')', '<', '>', '{', '}', '*', '?', '\'', '"', '\n', '\r',
];

/// A shell-command template with named `{{placeholder}}` markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    raw: String,
}

impl CommandTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Placeholder names literally present in the template.
    pub fn placeholders(&self) -> BTreeSet<String> {
        PLACEHOLDER_RE
            .captures_iter(&self.raw)
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Check that the declared parameter names and the placeholders in
    /// the template are exactly the same set, in both directions.
    pub fn validate_parameters(&self, declared: &[String]) -> Result<(), TemplateError> {
        let in_template = self.placeholders();
        let declared_set: BTreeSet<String> = declared.iter().cloned().collect();

        let undeclared: Vec<String> = in_template.difference(&declared_set).cloned().collect();
        if !undeclared.is_empty() {
            return Err(TemplateError::Undeclared(undeclared));
        }

        let unused: Vec<String> = declared_set.difference(&in_template).cloned().collect();
        if !unused.is_empty() {
            return Err(TemplateError::Unused(unused));
        }

        Ok(())
    }

    /// Substitute every placeholder from `params`, by name.
    ///
    /// Values must be scalar and free of shell metacharacters, quotes
    /// and newlines; anything else is rejected rather than escaped.
    pub fn render(&self, params: &ParamMap) -> Result<String, ExecutionError> {
        let mut command = self.raw.clone();
        for name in self.placeholders() {
            let value = params
                .get(&name)
                .ok_or_else(|| ExecutionError::MissingParameter(name.clone()))?;
            let text = scalar_to_string(&name, value)?;
            vet_value(&name, &text)?;
            command = command.replace(&format!("{{{{{name}}}}}"), &text);
        }
        Ok(command)
    }
}

fn scalar_to_string(name: &str, value: &serde_json::Value) -> Result<String, ExecutionError> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(ExecutionError::UnsafeValue {
            name: name.to_string(),
            value: other.to_string(),
        }),
    }
}

fn vet_value(name: &str, text: &str) -> Result<(), ExecutionError> {
    if text.contains(FORBIDDEN_VALUE_CHARS) {
        return Err(ExecutionError::UnsafeValue {
            name: name.to_string(),
            value: text.to_string(),
        });
    }
    Ok(())
}

/// Template/parameter-set mismatch found at learning or load time.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("placeholders used in the template but not declared as parameters: {0:?}")]
    Undeclared(Vec<String>),

    #[error("parameters declared but never used in the template: {0:?}")]
    Unused(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, serde_json::Value)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn placeholders_are_extracted_and_deduplicated() {
        let template = CommandTemplate::new("cp {{src}} {{dst}} && echo {{src}}");
        let names: Vec<String> = template.placeholders().into_iter().collect();
        assert_eq!(names, vec!["dst".to_string(), "src".to_string()]);
    }

    #[test]
    fn validate_accepts_exact_match() {
        let template = CommandTemplate::new("mkdir /tmp/{{folder}}");
        assert!(template
            .validate_parameters(&["folder".to_string()])
            .is_ok());
    }

    #[test]
    fn validate_rejects_undeclared_placeholder() {
        let template = CommandTemplate::new("echo {{a}} {{b}}");
        let err = template.validate_parameters(&["a".to_string()]).unwrap_err();
        match err {
            TemplateError::Undeclared(names) => assert_eq!(names, vec!["b".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_rejects_unused_declaration() {
        let template = CommandTemplate::new("echo {{a}}");
        let err = template
            .validate_parameters(&["a".to_string(), "b".to_string()])
            .unwrap_err();
        assert!(matches!(err, TemplateError::Unused(names) if names == vec!["b".to_string()]));
    }

    #[test]
    fn render_substitutes_literally() {
        let template = CommandTemplate::new("mkdir /tmp/{{folder}}");
        let command = template.render(&params(&[("folder", json!("x"))])).unwrap();
        assert_eq!(command, "mkdir /tmp/x");
    }

    #[test]
    fn render_accepts_numbers_and_booleans() {
        let template = CommandTemplate::new("sleep {{seconds}}");
        let command = template.render(&params(&[("seconds", json!(2))])).unwrap();
        assert_eq!(command, "sleep 2");
    }

    #[test]
    fn render_fails_on_missing_parameter() {
        let template = CommandTemplate::new("mkdir /tmp/{{folder}}");
        let err = template.render(&ParamMap::new()).unwrap_err();
        assert!(matches!(err, ExecutionError::MissingParameter(name) if name == "folder"));
    }

    #[test]
    fn render_rejects_shell_metacharacters() {
        let template = CommandTemplate::new("echo {{msg}}");
        for bad in ["a; rm -rf /", "a | tee /etc/passwd", "$(whoami)", "a'b", "x\ny"] {
            let err = template.render(&params(&[("msg", json!(bad))])).unwrap_err();
            assert!(
                matches!(err, ExecutionError::UnsafeValue { .. }),
                "value {bad:?} should have been rejected"
            );
        }
    }

    #[test]
    fn render_rejects_non_scalar_values() {
        let template = CommandTemplate::new("echo {{msg}}");
        let err = template
            .render(&params(&[("msg", json!(["a", "b"]))]))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::UnsafeValue { .. }));
    }

    #[test]
    fn render_allows_spaces_in_values() {
        let template = CommandTemplate::new("echo \"{{msg}}\"");
        let command = template
            .render(&params(&[("msg", json!("hello there"))]))
            .unwrap();
        assert_eq!(command, "echo \"hello there\"");
    }
}
