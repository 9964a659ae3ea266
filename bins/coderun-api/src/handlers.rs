// HTTP route handlers for the coderun API

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use coderun_common::redis;
use coderun_common::types::{
    ExecuteResponse, Execution, ExecutionRequest, Job, JobRecord, Language, LanguageEntry,
};
use coderun_judge::{ExecError, Executor};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageEntry>,
    pub judge_available: bool,
}

/// Metric label for a requested language
///
/// Only table languages become label values; client input is never used
/// verbatim, so the series count stays bounded.
fn language_label(name: &str) -> &'static str {
    Language::from_name(name)
        .map(|l| l.as_str())
        .unwrap_or("unsupported")
}

/// Metric label for the outcome of a synchronous execution
fn outcome_label(outcome: &Result<Execution, ExecError>) -> &'static str {
    match outcome {
        Ok(execution) if execution.passed() => "passed",
        Ok(_) => "failed",
        Err(_) => "error",
    }
}

fn reject_reason(err: &ExecError) -> &'static str {
    match err {
        ExecError::UnsupportedLanguage(_) => "unsupported_language",
        ExecError::JudgeUnavailable(_) => "judge_unavailable",
        _ => "other",
    }
}

/// POST /api/code/execute - Run code (and grade it) synchronously
pub async fn execute_code(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecutionRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let outcome = state.executor.execute(&payload, &state.shutdown).await;

    let execution_time_ms = outcome.as_ref().map(|e| e.execution_time_ms()).unwrap_or(0);
    metrics::record_execution(
        language_label(&payload.language),
        outcome_label(&outcome),
        execution_time_ms,
    );

    match outcome {
        Ok(execution) => {
            info!(
                language = %payload.language,
                test_cases = payload.test_cases.len(),
                passed = execution.passed(),
                execution_ms = execution_time_ms,
                "Execution served"
            );
            Ok(Json(execution.into()))
        }
        Err(e) => {
            warn!(language = %payload.language, error = %e, "Execution failed");
            if matches!(e, ExecError::UnsupportedLanguage(_) | ExecError::JudgeUnavailable(_)) {
                metrics::record_rejected(reject_reason(&e));
            }
            Err(e.into())
        }
    }
}

/// POST /api/code/jobs - Queue a request for the worker
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecutionRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    // Reject before queueing so the worker only sees runnable jobs
    let language = Executor::validate_language(&payload.language).map_err(|e| {
        metrics::record_rejected(reject_reason(&e));
        ApiError::from(e)
    })?;

    let job = Job::new(payload);

    let mut conn = state.redis.clone();
    redis::push_job(&mut conn, &job).await.map_err(|e| {
        error!(job_id = %job.id, error = %e, "Failed to queue job");
        ApiError::from(e)
    })?;

    metrics::record_job_submitted(language.as_str());
    info!(
        job_id = %job.id,
        language = %language,
        test_cases = job.request.test_cases.len(),
        "Job queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id: job.id.to_string(),
        }),
    ))
}

/// GET /api/code/jobs/{job_id} - Current record of a queued job
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let job_uuid = Uuid::parse_str(&job_id)
        .map_err(|_| ApiError::BadRequest("Invalid job ID format".to_string()))?;

    let mut conn = state.redis.clone();
    match redis::get_record(&mut conn, &job_uuid).await? {
        Some(record) => {
            info!(job_id = %job_id, status = ?record.status, "Job record retrieved");
            Ok(Json(record))
        }
        None => Err(ApiError::NotFound(format!("Job {} not found", job_id))),
    }
}

/// GET /api/code/languages - Supported languages
pub async fn list_languages(State(state): State<Arc<AppState>>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: Language::table(),
        judge_available: state.executor.judge_available(),
    })
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler() -> Result<impl IntoResponse, ApiError> {
    let body = metrics::render_metrics()
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {}", e)))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
