//! Turn Orchestration
//!
//! The control loop binding capture → resolve → lookup → execute →
//! report. Strictly sequential: one utterance is captured, resolved and
//! executed before the next is considered. No error in the taxonomy
//! terminates the loop; every turn ends back at idle.

use crate::capture::CaptureSource;
use crate::resolver::{IntentResolver, ResolveError, Resolution};
use crate::skills::SkillRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Where a turn ended. `Reported` covers both successful execution and
/// an execution failure that was surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    NoMatch,
    NeedsClarification,
    Reported,
    ServiceFailure,
}

/// Sink for everything the assistant says back to the user.
pub trait Reporter: Send {
    fn report(&mut self, message: &str);
}

/// Prints to stdout.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&mut self, message: &str) {
        println!("{message}");
    }
}

/// The single-threaded assistant loop.
pub struct Orchestrator<C: CaptureSource, R: Reporter> {
    registry: Arc<RwLock<SkillRegistry>>,
    resolver: IntentResolver,
    capture: C,
    reporter: R,
}

impl<C: CaptureSource, R: Reporter> Orchestrator<C, R> {
    pub fn new(
        registry: Arc<RwLock<SkillRegistry>>,
        resolver: IntentResolver,
        capture: C,
        reporter: R,
    ) -> Self {
        Self {
            registry,
            resolver,
            capture,
            reporter,
        }
    }

    /// Run turns until the capture source is exhausted.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        {
            let registry = self.registry.read().await;
            if registry.is_empty() {
                self.reporter
                    .report("I have no skills configured; I can listen but not act.");
            } else {
                info!(skills = registry.len(), "assistant ready");
            }
        }

        loop {
            match self.capture.listen_for_activation().await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!(error = %e, "activation listening failed");
                    self.reporter
                        .report("I had trouble listening; trying again.");
                    continue;
                }
            }

            let utterance = match self.capture.capture_command().await {
                Ok(Some(utterance)) => utterance,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "command capture failed");
                    self.reporter
                        .report("I could not make out a command; please try again.");
                    continue;
                }
            };

            self.turn(&utterance).await;
        }

        info!("capture source exhausted; shutting down");
        Ok(())
    }

    /// One full turn: resolve the utterance against a fresh catalog and
    /// act on the outcome.
    pub async fn turn(&mut self, utterance: &str) -> TurnOutcome {
        info!(utterance, "processing command");

        // Fresh catalog every turn: learning changes it mid-process.
        let catalog = self.registry.read().await.catalog();
        if catalog.is_empty() {
            self.reporter
                .report("I have no skills configured, so I cannot act on that.");
            return TurnOutcome::NoMatch;
        }

        let resolution = match self.resolver.resolve(utterance, &catalog).await {
            Ok(resolution) => resolution,
            Err(ResolveError::Engine(e)) => {
                warn!(error = %e, "reasoning engine unavailable");
                self.reporter.report(
                    "I could not reach my reasoning engine, so I did not act on that.",
                );
                return TurnOutcome::ServiceFailure;
            }
        };

        match resolution {
            Resolution::NoMatch { diagnostic } => {
                if let Some(diagnostic) = diagnostic {
                    debug!(%diagnostic, "resolution rejected");
                }
                self.reporter
                    .report("Sorry, none of my skills match that command.");
                TurnOutcome::NoMatch
            }
            Resolution::NeedsClarification { skill, missing } => {
                self.reporter.report(&format!(
                    "To run '{skill}' I still need: {}. Please repeat the command with that \
                     included.",
                    missing.join(", ")
                ));
                TurnOutcome::NeedsClarification
            }
            Resolution::Match { skill, params } => {
                // Clone the Arc and drop the guard before executing, so a
                // learning skill can take the write lock.
                let live = self.registry.read().await.get(&skill);
                let Some(live) = live else {
                    // Resolution only references catalog names, but the
                    // registry may have changed since the catalog snapshot.
                    warn!(skill = %skill, "resolved skill vanished before execution");
                    self.reporter
                        .report(&format!("The skill '{skill}' is not available anymore."));
                    return TurnOutcome::NoMatch;
                };

                debug!(skill = %skill, "executing skill");
                match live.invoke(&params).await {
                    Ok(result) => self.reporter.report(&result),
                    Err(e) => {
                        warn!(skill = %skill, error = %e, "skill execution failed");
                        self.reporter
                            .report(&format!("The skill '{skill}' failed: {e}"));
                    }
                }
                TurnOutcome::Reported
            }
        }
    }
}
