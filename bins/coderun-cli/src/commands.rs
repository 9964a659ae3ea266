// CLI commands for running code through the configured judge
use anyhow::{bail, Context, Result};
use coderun_common::types::{ExecuteResponse, ExecutionRequest, Language, TestCase};
use coderun_common::Config;
use coderun_judge::Executor;
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Load test cases from a JSON array file
pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read test cases from {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test cases in {}", path.display()))
}

/// Build a request from CLI inputs
pub fn build_request(
    language: &str,
    file: &Path,
    stdin: Option<&str>,
    tests: Option<&Path>,
) -> Result<ExecutionRequest> {
    if Language::from_name(language).is_none() {
        bail!(
            "Unsupported language '{}'. Supported: {}",
            language,
            Language::supported_names().join(", ")
        );
    }

    let code = fs::read_to_string(file)
        .with_context(|| format!("Failed to read source file {}", file.display()))?;

    let test_cases = match tests {
        Some(path) => load_test_cases(path)?,
        None => Vec::new(),
    };

    Ok(ExecutionRequest {
        code,
        language: language.to_string(),
        stdin: stdin.unwrap_or_default().to_string(),
        test_cases,
    })
}

/// Human-readable report of an execution
pub fn render_report(response: &ExecuteResponse) -> String {
    let mut out = String::new();

    if response.test_results.is_empty() {
        out.push_str(&response.output);
        if !response.output.is_empty() && !response.output.ends_with('\n') {
            out.push('\n');
        }
        if !response.error.is_empty() {
            out.push_str(&format!("--- error ---\n{}\n", response.error.trim_end()));
        }
        out.push_str(&format!(
            "{} (exit {}, {} ms)\n",
            if response.passed { "✓ passed" } else { "✗ failed" },
            response.exit_code,
            response.execution_time_ms
        ));
        return out;
    }

    let passed = response.test_results.iter().filter(|r| r.passed).count();

    for (idx, result) in response.test_results.iter().enumerate() {
        let label = result
            .test_case
            .description
            .clone()
            .unwrap_or_else(|| format!("test {}", idx + 1));

        if result.passed {
            out.push_str(&format!("✓ {} ({} ms)\n", label, result.execution_time_ms));
        } else if !result.error_message.is_empty() {
            out.push_str(&format!("✗ {}: {}\n", label, result.error_message));
        } else {
            out.push_str(&format!(
                "✗ {}: expected {:?}, got {:?}\n",
                label,
                result.test_case.expected_output.trim(),
                result.actual_output.trim()
            ));
        }
    }

    out.push_str(&format!(
        "{}/{} passed ({} ms)\n",
        passed,
        response.test_results.len(),
        response.execution_time_ms
    ));
    out
}

/// Execute a source file once or against a test file
///
/// Returns whether the run passed, for the process exit code.
pub async fn run(
    language: &str,
    file: &Path,
    stdin: Option<&str>,
    tests: Option<&Path>,
    json: bool,
) -> Result<bool> {
    let request = build_request(language, file, stdin, tests)?;

    let config = Config::from_env();
    let executor = Executor::from_config(&config).context("Failed to build judge client")?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let execution = executor
        .execute(&request, &cancel)
        .await
        .context("Execution failed")?;

    let response = ExecuteResponse::from(execution);
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", render_report(&response));
    }

    Ok(response.passed)
}

/// Print the language table
pub fn list_languages() {
    println!("{:<12} {}", "LANGUAGE", "JUDGE ID");
    for entry in Language::table() {
        println!("{:<12} {}", entry.name, entry.judge_id);
    }
}
