//! Stub judge and engine for unit tests.

use crate::engine::ExecutionEngine;
use crate::error::{ExecError, JudgeError};
use crate::judge::{JobHandle, JudgeClient, JudgeStatus, RawJudgeResult, SubmissionSpec};
use async_trait::async_trait;
use coderun_common::types::Language;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Responder = Box<dyn Fn(&SubmissionSpec) -> RawJudgeResult + Send + Sync>;

enum PollBehavior {
    /// `pending` non-terminal polls per submission, then `result`
    Script { pending: usize, result: RawJudgeResult },
    /// Always "In Queue"
    Never,
    /// The poll request never completes
    Hang,
    Respond(Responder),
}

pub(crate) struct StubJudge {
    available: bool,
    submit_fails: bool,
    behavior: PollBehavior,
    submissions: Mutex<Vec<SubmissionSpec>>,
    polls_per_handle: Mutex<HashMap<usize, usize>>,
    submit_calls: AtomicUsize,
    poll_calls: AtomicUsize,
}

impl StubJudge {
    fn with_behavior(behavior: PollBehavior) -> Self {
        Self {
            available: true,
            submit_fails: false,
            behavior,
            submissions: Mutex::new(Vec::new()),
            polls_per_handle: Mutex::new(HashMap::new()),
            submit_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
        }
    }

    pub fn pending_then(pending: usize, result: RawJudgeResult) -> Self {
        Self::with_behavior(PollBehavior::Script { pending, result })
    }

    pub fn finishing_with(result: RawJudgeResult) -> Self {
        Self::pending_then(0, result)
    }

    pub fn never_finishing() -> Self {
        Self::with_behavior(PollBehavior::Never)
    }

    pub fn hanging_poll() -> Self {
        Self::with_behavior(PollBehavior::Hang)
    }

    pub fn responding<F>(f: F) -> Self
    where
        F: Fn(&SubmissionSpec) -> RawJudgeResult + Send + Sync + 'static,
    {
        Self::with_behavior(PollBehavior::Respond(Box::new(f)))
    }

    /// Accepted runs whose stdout is the submitted stdin
    pub fn echo() -> Self {
        Self::responding(|spec| accepted(&spec.stdin, 0))
    }

    pub fn failing_submit() -> Self {
        Self {
            submit_fails: true,
            ..Self::never_finishing()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::never_finishing()
        }
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.submit_calls() + self.poll_calls()
    }

    pub fn submissions(&self) -> Vec<SubmissionSpec> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl JudgeClient for StubJudge {
    async fn submit(&self, spec: &SubmissionSpec) -> Result<JobHandle, JudgeError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        if self.submit_fails {
            return Err(JudgeError::Api {
                status: 500,
                body: "boom".to_string(),
            });
        }

        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(spec.clone());
        Ok(JobHandle::new((submissions.len() - 1).to_string()))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<RawJudgeResult, JudgeError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);

        let idx: usize = handle.token().parse().unwrap();
        let spec = self.submissions.lock().unwrap()[idx].clone();
        let seen = {
            let mut counts = self.polls_per_handle.lock().unwrap();
            let count = counts.entry(idx).or_insert(0);
            *count += 1;
            *count
        };

        match &self.behavior {
            PollBehavior::Script { pending, result } => {
                if seen <= *pending {
                    Ok(RawJudgeResult::with_status(JudgeStatus::new(2, "Processing")))
                } else {
                    Ok(result.clone())
                }
            }
            PollBehavior::Never => Ok(RawJudgeResult::with_status(JudgeStatus::new(1, "In Queue"))),
            PollBehavior::Hang => std::future::pending().await,
            PollBehavior::Respond(f) => Ok(f(&spec)),
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(500)
    }
}

pub(crate) struct StubEngine {
    language: Language,
    result: RawJudgeResult,
    calls: AtomicUsize,
}

impl StubEngine {
    pub fn new(language: Language, result: RawJudgeResult) -> Self {
        Self {
            language,
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionEngine for StubEngine {
    fn language(&self) -> Language {
        self.language
    }

    async fn run(
        &self,
        _source_code: &str,
        _stdin: &str,
        _cancel: &CancellationToken,
    ) -> Result<RawJudgeResult, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Finished run with the given stdout and exit code
pub(crate) fn accepted(stdout: &str, exit_code: i32) -> RawJudgeResult {
    RawJudgeResult {
        stdout: stdout.to_string(),
        exit_code: Some(exit_code),
        ..RawJudgeResult::with_status(JudgeStatus::accepted())
    }
}
