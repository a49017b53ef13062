//! Reasoning Engine Client
//!
//! The external engine that maps utterances onto skills. The wire
//! client targets the Anthropic Messages API; everything above it only
//! depends on the [`ReasoningEngine`] trait, so tests (and alternative
//! engines) plug in without touching the resolver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str =
    "You are the intent-resolution component of a voice assistant. You are given a catalog of \
     skills and one user utterance, and you answer with a single JSON object and nothing else.";

/// Engine-level failures, distinct from "no skill matched".
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no API key configured; set ANTHROPIC_API_KEY")]
    Unconfigured,

    #[error("reasoning engine request failed: {0}")]
    Transport(reqwest::Error),

    #[error("reasoning engine request timed out after {0} seconds")]
    Timeout(u64),

    #[error("reasoning engine returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("reasoning engine reply contained no text")]
    EmptyReply,
}

/// One-shot completion against the reasoning engine.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, EngineError>;
}

/// Message in the request body
#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

/// API request
#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: usize,
    system: &'static str,
    messages: Vec<Message>,
}

/// API response
#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

/// Claude-backed reasoning engine
#[derive(Clone)]
pub struct ClaudeEngine {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    timeout_secs: u64,
}

impl ClaudeEngine {
    /// `model` is a short hint (haiku, sonnet, opus) or a full model id.
    pub fn new(api_key: Option<&str>, model: &str, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.map(|s| s.to_string()),
            model: model.to_string(),
            timeout_secs,
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn model_id(&self) -> String {
        match self.model.to_lowercase().as_str() {
            "haiku" => "claude-3-5-haiku-20241022".to_string(),
            "opus" => "claude-3-opus-20240229".to_string(),
            "sonnet" => "claude-sonnet-4-20250514".to_string(),
            _ => self.model.clone(),
        }
    }
}

#[async_trait]
impl ReasoningEngine for ClaudeEngine {
    async fn complete(&self, prompt: &str) -> Result<String, EngineError> {
        let api_key = self.api_key.as_deref().ok_or(EngineError::Unconfigured)?;

        let request = MessageRequest {
            model: self.model_id(),
            max_tokens: 1024,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: prompt.to_string(),
            }],
        };

        debug!(model = %request.model, prompt_len = prompt.len(), "sending resolution request");

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .timeout(Duration::from_secs(self.timeout_secs))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout(self.timeout_secs)
                } else {
                    EngineError::Transport(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(EngineError::Status(response.status()));
        }

        let body: MessageResponse = response.json().await.map_err(EngineError::Transport)?;
        body.content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .next()
            .map(|text| text.to_string())
            .ok_or(EngineError::EmptyReply)
    }
}
