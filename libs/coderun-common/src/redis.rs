use crate::types::{Job, JobRecord};
use redis::{AsyncCommands, RedisResult};

/// Redis queue semantics for asynchronous execution jobs
/// API and worker share these keys, so they never drift

pub const QUEUE_KEY: &str = "coderun:queue:jobs";
pub const RESULT_PREFIX: &str = "coderun:result";

/// Generate record key for a job
pub fn result_key(job_id: &uuid::Uuid) -> String {
    format!("{}:{}", RESULT_PREFIX, job_id)
}

fn serde_error(context: &'static str, e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, context, e.to_string()))
}

/// Record the job as queued, then push it to the queue
/// Uses RPUSH for FIFO semantics
pub async fn push_job(conn: &mut redis::aio::ConnectionManager, job: &Job) -> RedisResult<()> {
    store_record(conn, &JobRecord::queued(job)).await?;

    let payload = serde_json::to_string(job).map_err(|e| serde_error("serialization error", e))?;
    conn.rpush(QUEUE_KEY, payload).await
}

/// Pop the next job
/// Uses BLPOP with timeout so the caller can observe shutdown
pub async fn pop_job(
    conn: &mut redis::aio::ConnectionManager,
    timeout_seconds: f64,
) -> RedisResult<Option<Job>> {
    let result: Option<(String, String)> = conn.blpop(QUEUE_KEY, timeout_seconds).await?;

    match result {
        Some((_key, payload)) => {
            let job: Job =
                serde_json::from_str(&payload).map_err(|e| serde_error("deserialization error", e))?;
            Ok(Some(job))
        }
        None => Ok(None),
    }
}

/// Return an unstarted job to the front of the queue
/// Uses LPUSH so it is the next job popped
pub async fn requeue_job(conn: &mut redis::aio::ConnectionManager, job: &Job) -> RedisResult<()> {
    let payload = serde_json::to_string(job).map_err(|e| serde_error("serialization error", e))?;
    conn.lpush(QUEUE_KEY, payload).await
}

/// Store a job record with a 24-hour TTL
pub async fn store_record(
    conn: &mut redis::aio::ConnectionManager,
    record: &JobRecord,
) -> RedisResult<()> {
    let key = result_key(&record.job_id);
    let payload = serde_json::to_string(record).map_err(|e| serde_error("serialization error", e))?;

    let _: () = conn.set_ex(&key, payload, 86400).await?;
    Ok(())
}

/// Retrieve a job record
pub async fn get_record(
    conn: &mut redis::aio::ConnectionManager,
    job_id: &uuid::Uuid,
) -> RedisResult<Option<JobRecord>> {
    let payload: Option<String> = conn.get(result_key(job_id)).await?;

    match payload {
        Some(data) => {
            let record: JobRecord =
                serde_json::from_str(&data).map_err(|e| serde_error("deserialization error", e))?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExecutionRequest, JobStatus};
    use uuid::Uuid;

    fn job() -> Job {
        Job::new(ExecutionRequest {
            code: "package main".to_string(),
            language: "go".to_string(),
            stdin: String::new(),
            test_cases: vec![],
        })
    }

    #[test]
    fn test_result_key_deterministic() {
        let id = Uuid::new_v4();
        let key1 = result_key(&id);
        let key2 = result_key(&id);
        assert_eq!(key1, key2);
        assert!(key1.starts_with("coderun:result:"));
        assert!(key1.contains(&id.to_string()));
    }

    #[test]
    fn test_queue_key() {
        assert_eq!(QUEUE_KEY, "coderun:queue:jobs");
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_queue_roundtrip() {
        let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
        let mut conn = redis::aio::ConnectionManager::new(client).await.unwrap();

        let job = job();
        push_job(&mut conn, &job).await.unwrap();

        let record = get_record(&mut conn, &job.id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Queued);

        let popped = pop_job(&mut conn, 1.0).await.unwrap().unwrap();
        assert_eq!(popped.id, job.id);
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_requeued_job_is_popped_next() {
        let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
        let mut conn = redis::aio::ConnectionManager::new(client).await.unwrap();

        let waiting = job();
        let returned = job();
        push_job(&mut conn, &waiting).await.unwrap();
        requeue_job(&mut conn, &returned).await.unwrap();

        assert_eq!(pop_job(&mut conn, 1.0).await.unwrap().unwrap().id, returned.id);
        assert_eq!(pop_job(&mut conn, 1.0).await.unwrap().unwrap().id, waiting.id);
    }
}
