/// Test Grading Aggregator - Per-Case Scoring Over Single Runs
///
/// **Core Responsibility:**
/// Run the submitted code once per test case and compare each output
/// against the expected output.
///
/// **Critical Properties:**
/// - Knows nothing about the judge wire protocol
/// - Cases run sequentially, in input order
/// - A failing case never aborts the remaining cases
/// - all_passed is true iff every case passed
///
/// **Normalization Rules:**
/// - Trim leading and trailing whitespace: YES
/// - Internal whitespace: preserved
/// - Case sensitivity: YES (exact match required)

use crate::executor::Executor;
use coderun_common::types::{AggregateResult, ExecutionRequest, TestCase, TestResult};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Whether an actual output matches the expected output after trimming
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    normalize_output(actual) == normalize_output(expected)
}

/// Grade a request against its test cases
///
/// ## Arguments
/// * `executor` - Orchestrator used for each single run
/// * `req` - Request whose `test_cases` are graded; its own stdin is ignored
/// * `cancel` - Aborts the in-flight run; later cases then fail fast
///
/// ## Returns
/// One TestResult per case, in order. Execution errors are recorded on the
/// case itself and never propagate.
pub async fn grade(
    executor: &Executor,
    req: &ExecutionRequest,
    cancel: &CancellationToken,
) -> AggregateResult {
    let start = Instant::now();
    let mut test_results = Vec::with_capacity(req.test_cases.len());

    for (index, test_case) in req.test_cases.iter().enumerate() {
        let result = grade_case(executor, req, test_case, cancel).await;

        if !result.error_message.is_empty() {
            warn!(test = index + 1, error = %result.error_message, "Test case errored");
        }

        test_results.push(result);
    }

    let passed = test_results.iter().filter(|r| r.passed).count();
    let all_passed = passed == test_results.len();

    info!(
        passed,
        total = test_results.len(),
        all_passed,
        "Grading finished"
    );

    AggregateResult {
        test_results,
        all_passed,
        execution_time_ms: start.elapsed().as_millis() as u64,
    }
}

async fn grade_case(
    executor: &Executor,
    req: &ExecutionRequest,
    test_case: &TestCase,
    cancel: &CancellationToken,
) -> TestResult {
    let start = Instant::now();
    let outcome = executor
        .execute_simple(&req.for_test_case(test_case), cancel)
        .await;

    match outcome {
        Ok(result) => TestResult {
            test_case: test_case.clone(),
            passed: outputs_match(&result.output, &test_case.expected_output),
            actual_output: result.output,
            error_message: result.error,
            execution_time_ms: result.execution_time_ms,
        },
        Err(e) => TestResult {
            test_case: test_case.clone(),
            actual_output: String::new(),
            passed: false,
            error_message: e.to_string(),
            execution_time_ms: start.elapsed().as_millis() as u64,
        },
    }
}
