//! Engine process execution.
//!
//! Two explicit modes:
//! - [`EngineExecutor::run_blocking`] waits for the engine and returns its
//!   captured output.
//! - [`EngineExecutor::run_detached`] returns as soon as the engine has
//!   started; the engine keeps running (e.g. its own GUI) and a background
//!   task reaps it.

use std::process::{Output, Stdio};
use std::time::Instant;

use async_trait::async_trait;
use pemu_core::{PemuError, Result};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::invocation::Invocation;

/// Output of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Set when the engine could not complete successfully.
    pub exit_error: Option<String>,

    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,

    pub stdout: String,

    /// Failure output. Non-empty stderr is the failure signal.
    pub stderr: String,

    pub duration_ms: u64,
}

impl ExecutionResult {
    /// A successful run that printed `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// A failed run whose failure text is `stderr`.
    pub fn failure(stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        Self {
            exit_error: Some(stderr.clone()),
            exit_code: Some(1),
            stderr,
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_error.is_none() && self.stderr.is_empty()
    }

    /// Normalise a finished blocking run.
    ///
    /// On success stdout is kept and engine stderr is dropped. On failure
    /// stdout is dropped and stderr carries `Command failed: <line>`
    /// followed by whatever the engine printed.
    fn from_blocking_output(invocation: &Invocation, output: Output, duration_ms: u64) -> Self {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code();

        if output.status.success() {
            if !stderr.trim().is_empty() {
                debug!(stderr = %stderr.trim(), "Engine wrote to stderr on success");
            }
            return Self {
                exit_error: None,
                exit_code,
                stdout,
                stderr: String::new(),
                duration_ms,
            };
        }

        let captured = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        let message = format!("Command failed: {}", invocation.command_line());
        let stderr = if captured.is_empty() {
            message.clone()
        } else {
            format!("{message}\n{captured}")
        };

        Self {
            exit_error: Some(message),
            exit_code,
            stdout: String::new(),
            stderr,
            duration_ms,
        }
    }

    /// Keep a detached run's stderr as captured. Its stdout is not collected.
    fn from_detached_output(invocation: &Invocation, output: Output, duration_ms: u64) -> Self {
        let exit_error = (!output.status.success())
            .then(|| format!("Command failed: {}", invocation.command_line()));

        Self {
            exit_error,
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
        }
    }
}

/// Handle to an engine started with [`EngineExecutor::run_detached`].
///
/// Dropping the handle does not stop the engine; the background task still
/// waits for and reaps the process.
#[derive(Debug)]
pub struct DetachedRun {
    pid: Option<u32>,
    handle: JoinHandle<ExecutionResult>,
}

impl DetachedRun {
    pub fn new(pid: Option<u32>, handle: JoinHandle<ExecutionResult>) -> Self {
        Self { pid, handle }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the engine to exit.
    pub async fn wait(self) -> Result<ExecutionResult> {
        self.handle
            .await
            .map_err(|e| PemuError::Io(std::io::Error::other(e.to_string())))
    }
}

/// Runs engine invocations.
#[async_trait]
pub trait EngineExecutor: Send + Sync {
    /// Run to completion and capture the output. There is no timeout.
    async fn run_blocking(&self, invocation: &Invocation) -> Result<ExecutionResult>;

    /// Start the engine and return without waiting.
    ///
    /// Must be called from within a tokio runtime.
    fn run_detached(&self, invocation: &Invocation) -> Result<DetachedRun>;
}

/// Executor that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    fn spawn(invocation: &Invocation, stdout: Stdio) -> Result<Child> {
        let (program, args) = invocation.argv()?;
        debug!(program = %program.display(), ?args, "Spawning engine");

        Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(PemuError::Spawn)
    }
}

#[async_trait]
impl EngineExecutor for ProcessExecutor {
    async fn run_blocking(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let start = Instant::now();
        let child = Self::spawn(invocation, Stdio::piped())?;
        let output = child.wait_with_output().await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = ExecutionResult::from_blocking_output(invocation, output, duration_ms);
        debug!(
            exit_code = ?result.exit_code,
            duration_ms = result.duration_ms,
            "Engine finished"
        );
        Ok(result)
    }

    fn run_detached(&self, invocation: &Invocation) -> Result<DetachedRun> {
        let start = Instant::now();
        // Detached stdout is never reported, so it is not collected.
        let child = Self::spawn(invocation, Stdio::null())?;
        let pid = child.id();
        let invocation = invocation.clone();

        let handle = tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(output) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    let result =
                        ExecutionResult::from_detached_output(&invocation, output, duration_ms);
                    debug!(
                        pid = ?pid,
                        exit_code = ?result.exit_code,
                        duration_ms,
                        "Detached engine exited"
                    );
                    result
                }
                Err(e) => {
                    warn!(pid = ?pid, error = %e, "Failed to wait for detached engine");
                    ExecutionResult {
                        exit_error: Some(e.to_string()),
                        stderr: e.to_string(),
                        duration_ms: start.elapsed().as_millis() as u64,
                        ..ExecutionResult::default()
                    }
                }
            }
        });

        Ok(DetachedRun::new(pid, handle))
    }
}
