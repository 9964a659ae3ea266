/// Execution Orchestrator - High-Level Coordination
///
/// **Responsibility:**
/// Validate a request, pick a backend, run it once and normalize the outcome.
///
/// **Architecture:**
/// 1. Judge client submits and polls the external judge (judge.rs)
/// 2. Local engine runs Go on the host when no judge exists (engine.rs)
/// 3. Evaluator fans test cases out through `execute_simple` (evaluator.rs)
///
/// **Single-run state machine:**
/// Validated → Submitted → Polling → Terminal → Normalized.
/// Every call starts a fresh sequence; nothing is retried.

use crate::engine::{ExecutionEngine, LocalGoEngine};
use crate::error::{ExecError, JudgeError, Result};
use crate::evaluator;
use crate::judge::{HttpJudgeClient, JudgeClient, RawJudgeResult, SubmissionSpec};
use coderun_common::config::Config;
use coderun_common::types::{Execution, ExecutionRequest, ExecutionResult, Language};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// The platform's own language: the only one the local engine may run
pub const FALLBACK_LANGUAGE: Language = Language::Go;

/// Where a single run goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Judge,
    /// Dev-only: judge unavailable AND language is the fallback language
    LocalFallback,
}

/// Fixed ceilings applied to every run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Overall deadline of one run, including queueing on the judge
    pub timeout: Duration,
    pub cpu_time_limit_secs: u64,
    pub memory_limit_kb: u64,
}

impl ExecutionLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.execution_timeout(),
            cpu_time_limit_secs: config.cpu_time_limit_secs,
            memory_limit_kb: config.memory_limit_kb(),
        }
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            cpu_time_limit_secs: 5,
            memory_limit_kb: 128 * 1024,
        }
    }
}

/// Orchestrator over a judge client and an optional local fallback
///
/// Holds only shared immutable state; clone it freely across tasks.
#[derive(Clone)]
pub struct Executor {
    judge: Arc<dyn JudgeClient>,
    fallback: Option<Arc<dyn ExecutionEngine>>,
    limits: ExecutionLimits,
}

impl Executor {
    pub fn new(
        judge: Arc<dyn JudgeClient>,
        fallback: Option<Arc<dyn ExecutionEngine>>,
        limits: ExecutionLimits,
    ) -> Self {
        Self {
            judge,
            fallback,
            limits,
        }
    }

    /// Production wiring: HTTP judge client, plus the Go engine when enabled
    pub fn from_config(config: &Config) -> std::result::Result<Self, JudgeError> {
        let judge = HttpJudgeClient::from_config(config)?;

        let fallback: Option<Arc<dyn ExecutionEngine>> = if config.local_fallback_enabled {
            Some(Arc::new(LocalGoEngine::new(config.local_fallback_timeout())))
        } else {
            None
        };

        if !judge.is_available() {
            warn!("Judge not configured - code execution limited to the local {} fallback", FALLBACK_LANGUAGE);
        }

        Ok(Self::new(Arc::new(judge), fallback, ExecutionLimits::from_config(config)))
    }

    pub fn judge_available(&self) -> bool {
        self.judge.is_available()
    }

    /// Validate a language name against the language table
    pub fn validate_language(name: &str) -> Result<Language> {
        Language::from_name(name).ok_or_else(|| ExecError::UnsupportedLanguage(name.to_string()))
    }

    /// Pick the backend for a language
    ///
    /// The local fallback is chosen only when no judge is configured and the
    /// language is the fallback language; everything else without a judge is
    /// `JudgeUnavailable`.
    pub fn route(&self, language: Language) -> Result<Backend> {
        if self.judge.is_available() {
            return Ok(Backend::Judge);
        }

        match &self.fallback {
            Some(engine) if language == FALLBACK_LANGUAGE && engine.language() == language => {
                Ok(Backend::LocalFallback)
            }
            _ => Err(ExecError::JudgeUnavailable(language)),
        }
    }

    /// Execute a request: a single run, or one graded run per test case
    ///
    /// The language is validated up front in both cases, so an unsupported
    /// language is reported to the caller rather than once per test case.
    pub async fn execute(
        &self,
        req: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<Execution> {
        Self::validate_language(&req.language)?;

        if req.test_cases.is_empty() {
            return Ok(Execution::Single(self.execute_simple(req, cancel).await?));
        }

        Ok(Execution::Graded(evaluator::grade(self, req, cancel).await))
    }

    /// Run a request exactly once, ignoring its test cases
    ///
    /// Elapsed time spans validation to normalization, so judge and local
    /// runs are measured the same way.
    #[instrument(skip(self, req, cancel), fields(language = %req.language))]
    pub async fn execute_simple(
        &self,
        req: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        let start = Instant::now();

        let language = Self::validate_language(&req.language)?;

        let spec = SubmissionSpec {
            source_code: req.code.clone(),
            language_id: language.judge_id(),
            stdin: req.stdin.clone(),
            cpu_time_limit: self.limits.cpu_time_limit_secs,
            memory_limit: self.limits.memory_limit_kb,
        };

        let raw = match self.route(language)? {
            Backend::Judge => {
                debug!(language_id = spec.language_id, "Submitting to judge");
                self.judge
                    .submit_and_wait(&spec, self.limits.timeout, cancel)
                    .await?
            }
            Backend::LocalFallback => {
                warn!("Judge unavailable - running locally (development only)");
                // Routing guarantees the engine exists
                match &self.fallback {
                    Some(engine) => engine.run(&req.code, &req.stdin, cancel).await?,
                    None => return Err(ExecError::JudgeUnavailable(language)),
                }
            }
        };

        let result = normalize(raw, start.elapsed().as_millis() as u64);

        info!(
            passed = result.passed,
            exit_code = result.exit_code,
            execution_ms = result.execution_time_ms,
            "Execution completed"
        );

        Ok(result)
    }
}

/// Map a judge-shaped result to the normalized pass/fail form
///
/// **Rules:**
/// - passed: status is Accepted AND exit code is 0 (absent exit code counts as 0)
/// - error: first non-empty of stderr, compile output, then the status
///   description when the status is not Accepted
pub fn normalize(raw: RawJudgeResult, execution_time_ms: u64) -> ExecutionResult {
    let exit_code = raw.exit_code.unwrap_or(0);
    let accepted = raw.status.is_accepted();

    let error = if !raw.stderr.is_empty() {
        raw.stderr
    } else if !raw.compile_output.is_empty() {
        raw.compile_output
    } else if !accepted {
        raw.status.description
    } else {
        String::new()
    };

    ExecutionResult {
        output: raw.stdout,
        error,
        passed: accepted && exit_code == 0,
        execution_time_ms,
        exit_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::JudgeStatus;
    use crate::test_support::{accepted, StubEngine, StubJudge};

    fn request(language: &str) -> ExecutionRequest {
        ExecutionRequest {
            code: "print(\"hi \")".to_string(),
            language: language.to_string(),
            stdin: String::new(),
            test_cases: vec![],
        }
    }

    fn executor_with(judge: Arc<StubJudge>, engine: Option<Arc<StubEngine>>) -> Executor {
        Executor::new(
            judge,
            engine.map(|e| e as Arc<dyn ExecutionEngine>),
            ExecutionLimits::default(),
        )
    }

    #[tokio::test]
    async fn test_unsupported_languages_make_no_calls() {
        let judge = Arc::new(StubJudge::echo());
        let engine = Arc::new(StubEngine::new(Language::Go, accepted("", 0)));
        let executor = executor_with(judge.clone(), Some(engine.clone()));
        let cancel = CancellationToken::new();

        for language in ["rust", "Python", "", "c#", "go ", "brainfuck"] {
            let err = executor
                .execute_simple(&request(language), &cancel)
                .await
                .unwrap_err();
            assert!(
                matches!(&err, ExecError::UnsupportedLanguage(l) if l == language),
                "{language:?} gave {err:?}"
            );

            let err = executor.execute(&request(language), &cancel).await.unwrap_err();
            assert!(matches!(err, ExecError::UnsupportedLanguage(_)));
        }

        assert_eq!(judge.total_calls(), 0);
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_passed_truth_table() {
        let cases = [
            (JudgeStatus::accepted(), 0, true),
            (JudgeStatus::accepted(), 1, false),
            (JudgeStatus::new(11, "Runtime Error (NZEC)"), 0, false),
            (JudgeStatus::new(4, "Wrong Answer"), 1, false),
        ];

        for (status, exit_code, expected) in cases {
            let raw = RawJudgeResult {
                status: status.clone(),
                exit_code: Some(exit_code),
                ..RawJudgeResult::with_status(status.clone())
            };
            let executor = executor_with(Arc::new(StubJudge::finishing_with(raw)), None);

            let result = executor
                .execute_simple(&request("python"), &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(result.passed, expected, "status {} exit {}", status.id, exit_code);
            assert_eq!(result.exit_code, exit_code);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_uses_language_id_and_limits() {
        let judge = Arc::new(StubJudge::echo());
        let executor = Executor::new(
            judge.clone(),
            None,
            ExecutionLimits {
                timeout: Duration::from_secs(10),
                cpu_time_limit_secs: 2,
                memory_limit_kb: 65536,
            },
        );

        let mut req = request("cpp");
        req.stdin = "42".to_string();
        executor
            .execute_simple(&req, &CancellationToken::new())
            .await
            .unwrap();

        let submitted = judge.submissions();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].language_id, 54);
        assert_eq!(submitted[0].stdin, "42");
        assert_eq!(submitted[0].cpu_time_limit, 2);
        assert_eq!(submitted[0].memory_limit, 65536);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_runs_are_stable() {
        let executor = executor_with(Arc::new(StubJudge::finishing_with(accepted("hi \n", 0))), None);
        let cancel = CancellationToken::new();

        let first = executor.execute_simple(&request("python"), &cancel).await.unwrap();
        let second = executor.execute_simple(&request("python"), &cancel).await.unwrap();

        assert_eq!(first.passed, second.passed);
        assert_eq!(first.output.trim(), second.output.trim());
    }

    #[tokio::test]
    async fn test_judge_unavailable_rejects_non_fallback_language() {
        let judge = Arc::new(StubJudge::unavailable());
        let engine = Arc::new(StubEngine::new(Language::Go, accepted("", 0)));
        let executor = executor_with(judge.clone(), Some(engine.clone()));

        let err = executor
            .execute_simple(&request("python"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::JudgeUnavailable(Language::Python)));
        assert_eq!(engine.calls(), 0);
        assert_eq!(judge.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_judge_unavailable_runs_fallback_language_locally() {
        let judge = Arc::new(StubJudge::unavailable());
        let engine = Arc::new(StubEngine::new(Language::Go, accepted("hello\n", 0)));
        let executor = executor_with(judge.clone(), Some(engine.clone()));

        let result = executor
            .execute_simple(&request("go"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(engine.calls(), 1);
        assert_eq!(judge.total_calls(), 0);
        assert!(result.passed);
        assert_eq!(result.output, "hello\n");
        assert_eq!(result.error, "");
    }

    #[tokio::test]
    async fn test_fallback_result_normalized_like_judge_result() {
        let raw = RawJudgeResult {
            stderr: "panic: boom".to_string(),
            ..accepted("partial", 2)
        };
        let via_engine = executor_with(
            Arc::new(StubJudge::unavailable()),
            Some(Arc::new(StubEngine::new(Language::Go, raw.clone()))),
        )
        .execute_simple(&request("go"), &CancellationToken::new())
        .await
        .unwrap();

        let via_judge = normalize(raw, via_engine.execution_time_ms);

        assert_eq!(via_engine, via_judge);
        assert!(!via_engine.passed);
        assert_eq!(via_engine.error, "panic: boom");
    }

    #[tokio::test]
    async fn test_disabled_fallback_means_judge_unavailable() {
        let executor = executor_with(Arc::new(StubJudge::unavailable()), None);

        let err = executor
            .execute_simple(&request("go"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::JudgeUnavailable(Language::Go)));
    }

    #[test]
    fn test_route_prefers_judge_when_available() {
        let executor = executor_with(
            Arc::new(StubJudge::echo()),
            Some(Arc::new(StubEngine::new(Language::Go, accepted("", 0)))),
        );

        assert_eq!(executor.route(Language::Go).unwrap(), Backend::Judge);
        assert_eq!(executor.route(Language::Java).unwrap(), Backend::Judge);
    }

    #[tokio::test(start_paused = true)]
    async fn test_judge_timeout_surfaces_as_timeout() {
        let executor = executor_with(Arc::new(StubJudge::never_finishing()), None);

        let err = executor
            .execute_simple(&request("java"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_judge_transport_errors_are_wrapped() {
        let executor = executor_with(Arc::new(StubJudge::failing_submit()), None);

        let err = executor
            .execute_simple(&request("javascript"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Judge(JudgeError::Api { status: 500, .. })));
    }

    #[test]
    fn test_error_text_priority() {
        let base = RawJudgeResult {
            stderr: "stderr".to_string(),
            compile_output: "compile".to_string(),
            ..RawJudgeResult::with_status(JudgeStatus::new(6, "Compilation Error"))
        };
        assert_eq!(normalize(base.clone(), 0).error, "stderr");

        let no_stderr = RawJudgeResult {
            stderr: String::new(),
            ..base.clone()
        };
        assert_eq!(normalize(no_stderr.clone(), 0).error, "compile");

        let status_only = RawJudgeResult {
            compile_output: String::new(),
            ..no_stderr
        };
        assert_eq!(normalize(status_only, 0).error, "Compilation Error");

        let clean = RawJudgeResult::with_status(JudgeStatus::accepted());
        assert_eq!(normalize(clean, 0).error, "");
    }

    #[test]
    fn test_missing_exit_code_counts_as_zero() {
        let result = normalize(RawJudgeResult::with_status(JudgeStatus::accepted()), 7);
        assert!(result.passed);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.execution_time_ms, 7);
    }
}
