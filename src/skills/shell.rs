//! Shell Execution
//!
//! Runs fully-substituted command strings for learned skills. This is
//! not a sandbox: it bounds the obvious failure modes (runaway time,
//! unbounded output, a short list of destructive patterns, environment
//! leakage) and nothing more.

use crate::skills::types::ExecutionError;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variables passed through to executed commands.
const ALLOWED_ENV_VARS: &[&str] = &["PATH", "HOME", "USER", "LANG", "TERM"];

/// Shell runner configuration
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Maximum execution time in seconds
    pub timeout_secs: u64,
    /// Maximum captured bytes per stream
    pub max_output_bytes: usize,
    /// Substrings that block a command outright
    pub blocked_patterns: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_output_bytes: 64 * 1024,
            blocked_patterns: default_blocked_patterns(),
        }
    }
}

fn default_blocked_patterns() -> Vec<String> {
    [
        "rm -rf /",
        "mkfs",
        "dd if=",
        ":(){",
        "| sh",
        "|sh",
        "| bash",
        "|bash",
        ">/etc/",
        ">>/etc/",
        ">/dev/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Outcome of one shell invocation
#[derive(Debug, Clone)]
pub struct ShellOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub truncated: bool,
    pub duration_ms: u64,
}

impl ShellOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human-readable result string surfaced to the user.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();

        if !stdout.is_empty() {
            parts.push(stdout.to_string());
        }
        if !stderr.is_empty() {
            parts.push(format!("stderr: {stderr}"));
        }
        if self.truncated {
            parts.push("(output truncated)".to_string());
        }
        match self.exit_code {
            Some(0) if parts.is_empty() => parts.push("Command completed with no output.".to_string()),
            Some(0) => {}
            Some(code) => parts.push(format!("Command exited with status {code}.")),
            None => parts.push("Command terminated without an exit status.".to_string()),
        }
        parts.join("\n")
    }
}

/// Executes substituted command strings via `sh -c`.
pub struct ShellRunner {
    config: ShellConfig,
}

impl ShellRunner {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    /// Screen a final command against the blocked-pattern list.
    pub fn screen(&self, command: &str) -> Result<(), ExecutionError> {
        let matches: Vec<&str> = self
            .config
            .blocked_patterns
            .iter()
            .filter(|p| command.contains(p.as_str()))
            .map(|p| p.as_str())
            .collect();
        if matches.is_empty() {
            Ok(())
        } else {
            warn!(command, patterns = ?matches, "blocked shell command");
            Err(ExecutionError::Blocked(format!(
                "matches blocked pattern(s): {}",
                matches.join(", ")
            )))
        }
    }

    /// Run `command` with a sanitized environment, bounded output and a
    /// hard timeout. The child is killed if the timeout elapses.
    pub async fn run(&self, command: &str) -> Result<ShellOutcome, ExecutionError> {
        self.screen(command)?;

        debug!(command, "running shell command");
        let start = Instant::now();

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .kill_on_drop(true);
        for var in ALLOWED_ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                cmd.env(var, value);
            }
        }

        let mut child = cmd.spawn()?;
        let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
            ExecutionError::Failed("child stdout pipe unavailable".to_string())
        })?;
        let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
            ExecutionError::Failed("child stderr pipe unavailable".to_string())
        })?;

        let cap = self.config.max_output_bytes;
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let result = tokio::time::timeout(timeout, async {
            let (stdout, stderr) = tokio::join!(
                read_capped(&mut stdout_pipe, cap),
                read_capped(&mut stderr_pipe, cap),
            );
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((stdout, stderr, status))
        })
        .await;

        match result {
            Ok(Ok(((stdout, out_trunc), (stderr, err_trunc), status))) => Ok(ShellOutcome {
                exit_code: status.code(),
                stdout,
                stderr,
                truncated: out_trunc || err_trunc,
                duration_ms: start.elapsed().as_millis() as u64,
            }),
            Ok(Err(e)) => Err(ExecutionError::Spawn(e)),
            Err(_) => {
                warn!(command, timeout_secs = self.config.timeout_secs, "shell command timed out");
                Err(ExecutionError::Timeout(self.config.timeout_secs))
            }
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(ShellConfig::default())
    }
}

async fn read_capped<R: AsyncReadExt + Unpin>(reader: &mut R, cap: usize) -> (String, bool) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() + n <= cap {
                    buf.extend_from_slice(&chunk[..n]);
                } else {
                    buf.extend_from_slice(&chunk[..cap.saturating_sub(buf.len()).min(n)]);
                    truncated = true;
                    // Keep draining so the child does not block on a full pipe.
                }
            }
            Err(_) => break,
        }
    }
    (String::from_utf8_lossy(&buf).to_string(), truncated)
}
