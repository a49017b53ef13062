//! End-to-End Dispatch Tests
//!
//! Drives the orchestrator loop with a scripted capture source and a
//! scripted reasoning engine: the whole turn path short of real audio
//! and a real LLM.

use async_trait::async_trait;
use hark::skills::shell::ShellRunner;
use hark::{
    CaptureSource, EngineError, IntentResolver, LearnedSkillStore, LearningProvider,
    Orchestrator, ReasoningEngine, Reporter, SkillProvider, SkillRegistry,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::RwLock;

struct ScriptedEngine {
    replies: Mutex<VecDeque<String>>,
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn complete(&self, _prompt: &str) -> Result<String, EngineError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(EngineError::EmptyReply)
    }
}

struct ScriptedCapture {
    utterances: VecDeque<String>,
}

#[async_trait]
impl CaptureSource for ScriptedCapture {
    async fn listen_for_activation(&mut self) -> anyhow::Result<bool> {
        Ok(!self.utterances.is_empty())
    }

    async fn capture_command(&mut self) -> anyhow::Result<Option<String>> {
        Ok(self.utterances.pop_front())
    }
}

struct CollectingReporter(Arc<Mutex<Vec<String>>>);

impl Reporter for CollectingReporter {
    fn report(&mut self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

async fn run_session(
    dir: &TempDir,
    engine_replies: &[&str],
    utterances: &[&str],
) -> Vec<String> {
    let store = LearnedSkillStore::new(dir.path().join("learned_skills.json"));
    let registry = Arc::new(RwLock::new(SkillRegistry::new()));
    let runner = Arc::new(ShellRunner::default());

    let providers: Vec<Box<dyn SkillProvider>> = vec![Box::new(LearningProvider::new(
        registry.clone(),
        store.clone(),
        runner.clone(),
    ))];
    {
        let mut reg = registry.write().await;
        reg.load_native(&providers);
        reg.load_learned(&store, &runner);
    }

    let engine = ScriptedEngine {
        replies: Mutex::new(engine_replies.iter().map(|s| s.to_string()).collect()),
    };
    let capture = ScriptedCapture {
        utterances: utterances.iter().map(|s| s.to_string()).collect(),
    };
    let messages = Arc::new(Mutex::new(Vec::new()));

    let mut orchestrator = Orchestrator::new(
        registry,
        IntentResolver::new(Arc::new(engine)),
        capture,
        CollectingReporter(messages.clone()),
    );
    orchestrator.run().await.unwrap();

    let collected = messages.lock().unwrap().clone();
    collected
}

#[tokio::test]
async fn learn_then_use_in_one_session() {
    let dir = TempDir::new().unwrap();

    let learn_reply = r#"{
        "chosen_skill": "learn_terminal_skill",
        "provided_parameters": {
            "new_skill_name": "shout_word",
            "new_skill_description": "Echoes one word.",
            "shell_command_template": "echo {{word}}",
            "template_parameters": ["word"]
        }
    }"#;
    let use_reply = r#"{"chosen_skill": "shout_word", "provided_parameters": {"word": "hooray"}}"#;

    let messages = run_session(
        &dir,
        &[learn_reply, use_reply],
        &["learn a skill that echoes a word", "shout hooray"],
    )
    .await;

    assert!(messages.iter().any(|m| m.contains("shout_word")));
    assert!(messages.iter().any(|m| m == "hooray"));
}

#[tokio::test]
async fn malformed_engine_reply_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();

    let messages = run_session(
        &dir,
        &[
            "the user clearly wants a joke",
            r#"{"chosen_skill": "none", "provided_parameters": {}}"#,
        ],
        &["tell me a joke", "do nothing"],
    )
    .await;

    // Both turns completed and both answered with a no-match report.
    let no_match_count = messages
        .iter()
        .filter(|m| m.contains("none of my skills"))
        .count();
    assert_eq!(no_match_count, 2);
}

#[tokio::test]
async fn clarification_turn_does_not_execute() {
    let dir = TempDir::new().unwrap();

    let incomplete = r#"{
        "chosen_skill": "learn_terminal_skill",
        "provided_parameters": {"new_skill_name": "half_baked"}
    }"#;

    let messages = run_session(&dir, &[incomplete], &["learn something vague"]).await;

    assert!(messages
        .iter()
        .any(|m| m.contains("learn_terminal_skill") && m.contains("still need")));

    // Nothing was learned.
    let store = LearnedSkillStore::new(dir.path().join("learned_skills.json"));
    assert!(store.load_all().unwrap().is_empty());
}
