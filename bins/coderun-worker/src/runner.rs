// Job processing: one queued job in, one finished record out

use async_trait::async_trait;
use coderun_common::redis;
use coderun_common::types::{Job, JobRecord, JobStatus};
use coderun_judge::Executor;
use ::redis::aio::ConnectionManager;
use ::redis::RedisResult;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Where the worker keeps job records and returns unstarted jobs
#[async_trait]
pub trait JobStore: Send {
    async fn store_record(&mut self, record: &JobRecord) -> RedisResult<()>;

    async fn requeue(&mut self, job: &Job) -> RedisResult<()>;
}

#[async_trait]
impl JobStore for ConnectionManager {
    async fn store_record(&mut self, record: &JobRecord) -> RedisResult<()> {
        redis::store_record(self, record).await
    }

    async fn requeue(&mut self, job: &Job) -> RedisResult<()> {
        redis::requeue_job(self, job).await
    }
}

/// What happened to a popped job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Executed; the final record has this status
    Recorded(JobStatus),
    /// Shutdown had already begun; the job went back to the queue unstarted
    Requeued,
}

/// Run a popped job and persist its records
///
/// A job popped after shutdown began is never started: it is returned to the
/// queue for another worker instead of being failed. Store errors are logged
/// and do not stop the worker.
pub async fn handle_job<S: JobStore>(
    store: &mut S,
    executor: &Executor,
    job: &Job,
    shutdown: &CancellationToken,
) -> Handled {
    if shutdown.is_cancelled() {
        warn!(job_id = %job.id, "Shutdown in progress - returning job to the queue");
        if let Err(e) = store.requeue(job).await {
            error!(job_id = %job.id, error = %e, "Failed to requeue job");
        }
        return Handled::Requeued;
    }

    if let Err(e) = store.store_record(&JobRecord::running(job)).await {
        error!(job_id = %job.id, error = %e, "Failed to mark job running");
    }

    let record = process_job(executor, job, shutdown).await;

    match store.store_record(&record).await {
        Ok(()) => info!(job_id = %job.id, status = ?record.status, "Record persisted"),
        Err(e) => error!(job_id = %job.id, error = %e, "Failed to persist record"),
    }

    Handled::Recorded(record.status)
}

/// Execute a job and build its final record
///
/// Graded runs always complete (per-case errors live in the results).
/// A single run that errors, including a cancelled one, is recorded as failed.
#[instrument(skip_all, fields(job_id = %job.id, language = %job.request.language))]
pub async fn process_job(executor: &Executor, job: &Job, cancel: &CancellationToken) -> JobRecord {
    match executor.execute(&job.request, cancel).await {
        Ok(execution) => {
            info!(
                passed = execution.passed(),
                execution_ms = execution.execution_time_ms(),
                "Execution completed"
            );

            let record = JobRecord::completed(job, execution.into());
            if let Some(response) = &record.response {
                for (idx, test_result) in response.test_results.iter().enumerate() {
                    debug!(
                        test_num = idx + 1,
                        passed = test_result.passed,
                        execution_ms = test_result.execution_time_ms,
                        "Test result"
                    );
                }
            }
            record
        }
        Err(e) => {
            warn!(error = %e, "Execution failed");
            JobRecord::failed(job, e.to_string())
        }
    }
}
