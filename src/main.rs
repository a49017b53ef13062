//! Hark - Entry Point
//!
//! Wires the registry, engine and capture source together and runs the
//! assistant loop on the console.

use hark::skills::builtin::{KnowledgeProvider, SystemProvider, WebProvider};
use hark::skills::shell::{ShellConfig, ShellRunner};
use hark::{
    ClaudeEngine, Config, ConsoleCapture, ConsoleReporter, IntentResolver, LearnedSkillStore,
    LearningProvider, Orchestrator, SkillProvider, SkillRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("Hark v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: hark");
        println!();
        println!("Voice-driven command dispatcher. Reads from stdin: a line containing");
        println!("the wake word activates; the command is the rest of the line or the");
        println!("next line.");
        println!();
        println!("Environment variables:");
        println!("  ANTHROPIC_API_KEY    Reasoning engine API key");
        println!("  HARK_MODEL           Model hint: haiku, sonnet, opus (default: sonnet)");
        println!("  HARK_WAKE_WORD       Activation phrase (default: hark)");
        println!("  HARK_DATA_DIR        Data directory for persisted stores");
        println!("  HARK_ENGINE_TIMEOUT  Reasoning request timeout in seconds (default: 30)");
        println!("  HARK_SHELL_TIMEOUT   Learned-command timeout in seconds (default: 30)");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Hark v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let runner = Arc::new(ShellRunner::new(ShellConfig {
        timeout_secs: config.shell_timeout_secs,
        ..Default::default()
    }));
    let store = LearnedSkillStore::new(config.learned_skills_path.clone());
    let registry = Arc::new(RwLock::new(SkillRegistry::new()));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .user_agent(concat!("hark/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let providers: Vec<Box<dyn SkillProvider>> = vec![
        Box::new(SystemProvider),
        Box::new(WebProvider::new(http)),
        Box::new(KnowledgeProvider::new(config.facts_path.clone())),
        Box::new(LearningProvider::new(
            registry.clone(),
            store.clone(),
            runner.clone(),
        )),
    ];

    {
        let mut registry = registry.write().await;
        let native = registry.load_native(&providers);
        let learned = registry.load_learned(&store, &runner);
        info!(native, learned, "registry loaded");
    }

    let engine = ClaudeEngine::new(
        config.anthropic_api_key.as_deref(),
        &config.model,
        config.engine_timeout_secs,
    );
    if !engine.is_available() {
        warn!("ANTHROPIC_API_KEY not set; commands will fail until it is configured");
    }

    let resolver = IntentResolver::new(Arc::new(engine));
    let capture = ConsoleCapture::new(&config.wake_word);

    let mut orchestrator = Orchestrator::new(registry, resolver, capture, ConsoleReporter);
    orchestrator.run().await
}
