//! System Interaction Skills
//!
//! Desktop-facing builtins: launching applications and opening a web
//! search in the default browser. Launches are fire-and-forget; the
//! result string reports the attempt, not the application's fate.

use crate::skills::registry::SkillProvider;
use crate::skills::types::{ExecutionError, ParamMap, ParameterDefinition, Skill, SkillAction};
use async_trait::async_trait;
use std::process::Command;
use std::sync::Arc;
use tracing::debug;

/// Provider for the system-interaction skills.
pub struct SystemProvider;

impl SkillProvider for SystemProvider {
    fn name(&self) -> &'static str {
        "system"
    }

    fn skills(&self) -> anyhow::Result<Vec<Skill>> {
        Ok(vec![
            Skill::new(
                "open_application",
                "Opens an application on this computer by its friendly name, e.g. 'calculator', \
                 'browser', 'terminal' or 'text editor'.",
                vec![ParameterDefinition::string(
                    "app_name",
                    "Friendly name of the application to open, e.g. 'calculator', 'browser', \
                     'terminal'.",
                    true,
                )],
                Arc::new(OpenApplication),
            )?,
            Skill::new(
                "search_web",
                "Searches the web for a term or question and opens the results in the default \
                 browser.",
                vec![ParameterDefinition::string(
                    "query",
                    "The term, phrase or full question to search for.",
                    true,
                )],
                Arc::new(SearchWeb),
            )?,
        ])
    }
}

struct OpenApplication;

#[async_trait]
impl SkillAction for OpenApplication {
    async fn run(&self, params: &ParamMap) -> Result<String, ExecutionError> {
        let app_name = string_param(params, "app_name")?;
        let target = mapped_app(&app_name).unwrap_or(&app_name);

        debug!(app = %app_name, target, "launching application");
        launch_app(target)?;
        Ok(format!("Trying to open '{app_name}'."))
    }
}

/// Friendly-name map for the current platform. Unmapped names fall
/// through and are tried as-is.
fn mapped_app(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();

    #[cfg(target_os = "macos")]
    let mappings: &[(&str, &str)] = &[
        ("calculator", "Calculator"),
        ("text editor", "TextEdit"),
        ("terminal", "Terminal"),
        ("browser", "Safari"),
        ("safari", "Safari"),
        ("chrome", "Google Chrome"),
        ("firefox", "Firefox"),
        ("finder", "Finder"),
    ];

    #[cfg(target_os = "windows")]
    let mappings: &[(&str, &str)] = &[
        ("calculator", "calc"),
        ("text editor", "notepad"),
        ("notepad", "notepad"),
        ("terminal", "cmd"),
        ("browser", "msedge"),
        ("explorer", "explorer"),
    ];

    #[cfg(all(unix, not(target_os = "macos")))]
    let mappings: &[(&str, &str)] = &[
        ("calculator", "gnome-calculator"),
        ("text editor", "gedit"),
        ("terminal", "gnome-terminal"),
        ("browser", "firefox"),
        ("firefox", "firefox"),
        ("chrome", "google-chrome"),
        ("files", "nautilus"),
    ];

    mappings
        .iter()
        .find(|(friendly, _)| *friendly == name)
        .map(|(_, target)| *target)
}

fn launch_app(target: &str) -> Result<(), ExecutionError> {
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = Command::new("open");
        c.args(["-a", target]);
        c
    };

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", target]);
        c
    };

    #[cfg(all(unix, not(target_os = "macos")))]
    let mut command = Command::new(target);

    command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExecutionError::Failed(format!(
                "'{target}' was not found; is it installed and on the PATH?"
            ))
        } else {
            ExecutionError::Spawn(e)
        }
    })?;
    Ok(())
}

struct SearchWeb;

#[async_trait]
impl SkillAction for SearchWeb {
    async fn run(&self, params: &ParamMap) -> Result<String, ExecutionError> {
        let query = string_param(params, "query")?;
        let url = search_url(&query)?;

        open_in_browser(url.as_str())?;
        Ok(format!("Searching the web for '{query}' in your browser."))
    }
}

fn search_url(query: &str) -> Result<reqwest::Url, ExecutionError> {
    reqwest::Url::parse_with_params("https://www.google.com/search", &[("q", query)])
        .map_err(|e| ExecutionError::Failed(format!("could not build search URL: {e}")))
}

fn open_in_browser(url: &str) -> Result<(), ExecutionError> {
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = Command::new("open");
        c.arg(url);
        c
    };

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    };

    #[cfg(all(unix, not(target_os = "macos")))]
    let mut command = {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    command.spawn().map_err(ExecutionError::Spawn)?;
    Ok(())
}

fn string_param(params: &ParamMap, key: &str) -> Result<String, ExecutionError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ExecutionError::MissingParameter(key.to_string()))
}
