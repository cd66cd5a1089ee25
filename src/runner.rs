//! External measurement process runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl CommandSpec {
    /// Build from an argv list; `None` when the list is empty.
    pub fn from_argv(argv: &[String], cwd: &Path, timeout: Duration) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
            timeout,
        })
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|a| a.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What happened to an external run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Finished {
        success: bool,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// Killed after exceeding its wall-clock bound.
    TimedOut { after: Duration },
    /// Could not be started at all (missing binary, permissions).
    Unavailable { reason: String },
}

/// Runs external commands. Validators only go through this seam.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> RunOutcome;
}

/// Runs commands as child processes under a timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> RunOutcome {
        debug!(command = %spec.display(), timeout = ?spec.timeout, "Running external command");

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %spec.program, error = %e, "Failed to start command");
                let reason = if e.kind() == std::io::ErrorKind::NotFound {
                    format!("{} not found", spec.program)
                } else {
                    format!("{} could not be started: {}", spec.program, e)
                };
                return RunOutcome::Unavailable { reason };
            }
        };

        // Dropping the future on timeout drops the child, which kills it.
        match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => RunOutcome::Finished {
                success: output.status.success(),
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Ok(Err(e)) => RunOutcome::Unavailable {
                reason: format!("{} failed while running: {}", spec.program, e),
            },
            Err(_) => {
                warn!(command = %spec.display(), "Command timed out");
                RunOutcome::TimedOut {
                    after: spec.timeout,
                }
            }
        }
    }
}

/// Last `max_lines` lines of captured output.
pub fn tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
