use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Languages the judge can run
/// Each variant maps to a fixed judge-side language id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Java,
    Go,
    Cpp,
}

impl Language {
    /// Returns all language variants
    /// This is the single source of truth for available languages
    pub fn all_variants() -> &'static [Language] {
        &[
            Language::Python,
            Language::Javascript,
            Language::Java,
            Language::Go,
            Language::Cpp,
        ]
    }

    /// Parse a language from its wire name
    ///
    /// Names are exact and lowercase: "Python" is not a supported language.
    pub fn from_name(s: &str) -> Option<Language> {
        match s {
            "python" => Some(Language::Python),
            "javascript" => Some(Language::Javascript),
            "java" => Some(Language::Java),
            "go" => Some(Language::Go),
            "cpp" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Java => "java",
            Language::Go => "go",
            Language::Cpp => "cpp",
        }
    }

    /// Judge0 language id
    pub fn judge_id(&self) -> u32 {
        match self {
            Language::Python => 71,     // Python 3
            Language::Javascript => 63, // Node.js
            Language::Java => 62,
            Language::Go => 60,
            Language::Cpp => 54, // C++17
        }
    }

    /// Names of every supported language, in table order
    pub fn supported_names() -> Vec<&'static str> {
        Self::all_variants().iter().map(|l| l.as_str()).collect()
    }

    /// The language table as exposed to callers
    pub fn table() -> Vec<LanguageEntry> {
        Self::all_variants()
            .iter()
            .map(|l| LanguageEntry {
                name: l.as_str(),
                judge_id: l.judge_id(),
            })
            .collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageEntry {
    pub name: &'static str,
    pub judge_id: u32,
}

/// Test Case Definition (Immutable Input)
/// Ordering matters - results are reported in the order cases were given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Execution request as received from the delivery layer
///
/// `language` stays a plain string here: validation against the language
/// table happens in the orchestrator, before any network call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_cases: Vec<TestCase>,
}

impl ExecutionRequest {
    /// Single-run request for one test case: same code and language, case input as stdin
    pub fn for_test_case(&self, test_case: &TestCase) -> ExecutionRequest {
        ExecutionRequest {
            code: self.code.clone(),
            language: self.language.clone(),
            stdin: test_case.input.clone(),
            test_cases: Vec::new(),
        }
    }
}

/// Normalized outcome of a single run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub output: String,
    pub error: String,
    pub passed: bool,
    pub execution_time_ms: u64,
    pub exit_code: i32,
}

/// Per-Test Result
/// Captures individual test case outcome, including execution-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_case: TestCase,
    pub actual_output: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    pub execution_time_ms: u64,
}

/// Outcome of a graded run
///
/// ## Semantics:
/// - test_results: one entry per test case, in input order
/// - all_passed: true iff every test result passed
/// - execution_time_ms: end-to-end wall clock of the whole grading run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub test_results: Vec<TestResult>,
    pub all_passed: bool,
    pub execution_time_ms: u64,
}

/// What `execute` produced: a single run or a graded set of runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Single(ExecutionResult),
    Graded(AggregateResult),
}

impl Execution {
    pub fn passed(&self) -> bool {
        match self {
            Execution::Single(r) => r.passed,
            Execution::Graded(r) => r.all_passed,
        }
    }

    pub fn execution_time_ms(&self) -> u64 {
        match self {
            Execution::Single(r) => r.execution_time_ms,
            Execution::Graded(r) => r.execution_time_ms,
        }
    }
}

/// Response contract for the delivery layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub output: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_results: Vec<TestResult>,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

impl From<ExecutionResult> for ExecuteResponse {
    fn from(r: ExecutionResult) -> Self {
        Self {
            output: r.output,
            error: r.error,
            passed: r.passed,
            test_results: Vec::new(),
            execution_time_ms: r.execution_time_ms,
            exit_code: r.exit_code,
        }
    }
}

impl From<AggregateResult> for ExecuteResponse {
    fn from(r: AggregateResult) -> Self {
        Self {
            output: String::new(),
            error: String::new(),
            passed: r.all_passed,
            test_results: r.test_results,
            execution_time_ms: r.execution_time_ms,
            exit_code: 0,
        }
    }
}

impl From<Execution> for ExecuteResponse {
    fn from(e: Execution) -> Self {
        match e {
            Execution::Single(r) => r.into(),
            Execution::Graded(r) => r.into(),
        }
    }
}

/// Queued Execution Job (Immutable)
/// A job is write-once - the worker never mutates the request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub request: ExecutionRequest,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(request: ExecutionRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            submitted_at: Utc::now(),
        }
    }
}

/// Job State Machine
/// queued → running → completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Stored view of a queued job
/// Written by the API (queued) and the worker (running, completed, failed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ExecuteResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn queued(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: JobStatus::Queued,
            response: None,
            error: None,
            submitted_at: job.submitted_at,
            completed_at: None,
        }
    }

    pub fn running(job: &Job) -> Self {
        Self {
            status: JobStatus::Running,
            ..Self::queued(job)
        }
    }

    pub fn completed(job: &Job, response: ExecuteResponse) -> Self {
        Self {
            status: JobStatus::Completed,
            response: Some(response),
            completed_at: Some(Utc::now()),
            ..Self::queued(job)
        }
    }

    pub fn failed(job: &Job, error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
            ..Self::queued(job)
        }
    }
}
