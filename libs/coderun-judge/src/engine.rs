/// Local Execution Engine - Degraded-Mode Fallback
///
/// **Core Responsibility:**
/// Run source code on the host when no judge is configured, and report the
/// outcome in the same shape the judge would.
///
/// **Critical Properties:**
/// - Runs only the platform's own language (Go)
/// - Enforces a wall-clock timeout by killing the child process
/// - NO resource isolation, NO memory capping
///
/// **Development only.** Production deployments must configure a judge;
/// the orchestrator selects this path only when the judge is unavailable.

use crate::error::ExecError;
use crate::judge::{JudgeStatus, RawJudgeResult};
use async_trait::async_trait;
use coderun_common::types::Language;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Kills the child's whole process group when dropped
///
/// `go run` builds the program and runs it as a grandchild, and a program
/// may fork further. Killing only the direct child would leave them running.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            // Negative pid addresses the group; ESRCH once everything exited
            let _ = unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
        }
    }
}

/// Execution engine trait
///
/// Any implementation must guarantee:
/// 1. Execute source_code with the given stdin
/// 2. Respect its own wall-clock timeout
/// 3. Capture stdout/stderr and the exit code
/// 4. Return a judge-shaped result so normalization is shared
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// The one language this engine can run
    fn language(&self) -> Language;

    async fn run(
        &self,
        source_code: &str,
        stdin: &str,
        cancel: &CancellationToken,
    ) -> Result<RawJudgeResult, ExecError>;
}

/// Runs Go programs with `go run` in a throwaway directory
#[derive(Debug, Clone)]
pub struct LocalGoEngine {
    timeout: Duration,
    go_binary: String,
}

impl LocalGoEngine {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            go_binary: "go".to_string(),
        }
    }

    pub fn with_binary(mut self, go_binary: impl Into<String>) -> Self {
        self.go_binary = go_binary.into();
        self
    }
}

#[async_trait]
impl ExecutionEngine for LocalGoEngine {
    fn language(&self) -> Language {
        Language::Go
    }

    #[instrument(skip_all, fields(timeout_ms = self.timeout.as_millis() as u64))]
    async fn run(
        &self,
        source_code: &str,
        stdin: &str,
        cancel: &CancellationToken,
    ) -> Result<RawJudgeResult, ExecError> {
        // Removed when dropped, on every exit path
        let workdir = tempfile::Builder::new().prefix("coderun-go-").tempdir()?;
        tokio::fs::write(workdir.path().join("main.go"), source_code).await?;

        let mut command = Command::new(&self.go_binary);
        command
            .args(["run", "main.go"])
            .current_dir(workdir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so timeout and cancellation reach every descendant
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let _group = ProcessGroupGuard { pgid: child.id() };

        // Feed stdin from a separate task so a program that never reads it
        // cannot block output collection
        if let Some(mut pipe) = child.stdin.take() {
            let input = stdin.to_string();
            tokio::spawn(async move {
                let _ = pipe.write_all(input.as_bytes()).await;
            });
        }

        let start = Instant::now();

        // Any exit from here on kills the group via `_group`
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, child.wait_with_output()) => outcome,
        };

        let elapsed = start.elapsed();

        match outcome {
            Ok(output) => {
                let output = output?;
                let exit_code = output.status.code().unwrap_or(-1);
                debug!(exit_code, elapsed_ms = elapsed.as_millis() as u64, "Local run finished");

                Ok(RawJudgeResult {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    time: Some(format!("{:.3}", elapsed.as_secs_f64())),
                    exit_code: Some(exit_code),
                    ..RawJudgeResult::with_status(JudgeStatus::accepted())
                })
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Local run timed out - killed");

                Ok(RawJudgeResult {
                    time: Some(format!("{:.3}", elapsed.as_secs_f64())),
                    exit_code: Some(-1),
                    ..RawJudgeResult::with_status(JudgeStatus::new(
                        JudgeStatus::TIME_LIMIT_EXCEEDED,
                        "Time Limit Exceeded",
                    ))
                })
            }
        }
    }
}
