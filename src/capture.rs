//! Utterance Capture
//!
//! The capture collaborator supplies activation detection and command
//! text; microphone handling and speech-to-text live behind this trait,
//! outside the crate. The console source makes the binary usable (and
//! the loop testable) with typed input: a line containing the wake word
//! activates, and the command is either the rest of that line or the
//! next non-empty line.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

/// Supplies utterances to the orchestrator, one per turn.
#[async_trait]
pub trait CaptureSource: Send {
    /// Block until the activation phrase is heard. `false` means the
    /// source is exhausted and the session should end.
    async fn listen_for_activation(&mut self) -> anyhow::Result<bool>;

    /// Capture one command utterance. `None` means the source is
    /// exhausted.
    async fn capture_command(&mut self) -> anyhow::Result<Option<String>>;
}

/// Line-oriented capture over stdin.
pub struct ConsoleCapture {
    wake_word: String,
    lines: Lines<BufReader<Stdin>>,
    /// Command text that arrived on the same line as the wake word.
    pending: Option<String>,
}

impl ConsoleCapture {
    pub fn new(wake_word: &str) -> Self {
        Self {
            wake_word: wake_word.to_lowercase(),
            lines: BufReader::new(tokio::io::stdin()).lines(),
            pending: None,
        }
    }
}

#[async_trait]
impl CaptureSource for ConsoleCapture {
    async fn listen_for_activation(&mut self) -> anyhow::Result<bool> {
        while let Some(line) = self.lines.next_line().await? {
            let lower = line.to_lowercase();
            if let Some(position) = lower.find(&self.wake_word) {
                // Index into the original line; lowercasing can shift byte
                // offsets for some scripts, so fall back to the next line.
                let remainder = line
                    .get(position + self.wake_word.len()..)
                    .unwrap_or("")
                    .trim_start_matches([',', ':', ' '])
                    .trim();
                if !remainder.is_empty() {
                    self.pending = Some(remainder.to_string());
                }
                debug!("activation phrase heard");
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn capture_command(&mut self) -> anyhow::Result<Option<String>> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }
        while let Some(line) = self.lines.next_line().await? {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
        Ok(None)
    }
}
