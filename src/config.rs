//! Configuration management

use anyhow::Result;
use std::path::PathBuf;

/// Assistant configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Anthropic API key (optional - without it resolution degrades to a
    /// reported service failure)
    pub anthropic_api_key: Option<String>,

    /// Reasoning model hint (haiku, sonnet, opus) or full model id
    pub model: String,

    /// Timeout for one reasoning-engine request, in seconds
    pub engine_timeout_secs: u64,

    /// Timeout for one learned-skill shell command, in seconds
    pub shell_timeout_secs: u64,

    /// Data directory holding the persisted stores
    pub data_dir: PathBuf,

    /// Learned-skill store file
    pub learned_skills_path: PathBuf,

    /// Fact-base file
    pub facts_path: PathBuf,

    /// Activation phrase the capture source listens for
    pub wake_word: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();

        let model = std::env::var("HARK_MODEL").unwrap_or_else(|_| "sonnet".to_string());

        let engine_timeout_secs = env_u64("HARK_ENGINE_TIMEOUT", 30);
        let shell_timeout_secs = env_u64("HARK_SHELL_TIMEOUT", 30);

        let data_dir = match std::env::var("HARK_DATA_DIR") {
            Ok(dir) => PathBuf::from(shellexpand::tilde(&dir).into_owned()),
            Err(_) => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("hark"),
        };

        let learned_skills_path = env_path("HARK_LEARNED_SKILLS")
            .unwrap_or_else(|| data_dir.join("learned_skills.json"));
        let facts_path =
            env_path("HARK_FACTS").unwrap_or_else(|| data_dir.join("facts.json"));

        let wake_word = std::env::var("HARK_WAKE_WORD").unwrap_or_else(|_| "hark".to_string());

        Ok(Self {
            anthropic_api_key,
            model,
            engine_timeout_secs,
            shell_timeout_secs,
            data_dir,
            learned_skills_path,
            facts_path,
            wake_word,
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|v| PathBuf::from(shellexpand::tilde(&v).into_owned()))
}
