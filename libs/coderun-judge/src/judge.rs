/// Judge Client - Transport Adapter for the Judge0 Submit/Poll Protocol
///
/// **Core Responsibility:**
/// Submit source code to the external judge and wait for a terminal result.
///
/// **Critical Architectural Boundary:**
/// - Client knows the wire protocol (paths, headers, JSON shapes)
/// - Client knows which statuses are terminal
/// - Client does NOT decide pass/fail (orchestrator's job)
/// - Client never retries and never cancels jobs on the judge side
///
/// **Protocol:**
/// - `POST {base}/submissions?base64_encoded=false&wait=false` → `{token}`
/// - `GET {base}/submissions/{token}?base64_encoded=false` → result

use crate::error::JudgeError;
use async_trait::async_trait;
use coderun_common::config::Config;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const RAPIDAPI_HOST: &str = "judge0-ce.p.rapidapi.com";

/// Judge-side status
///
/// Ids 1 ("In Queue") and 2 ("Processing") mean the run is still pending.
/// 3 is "Accepted"; every id from 4 up is a finished run that went wrong
/// (wrong answer, time limit, compile error, runtime error, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeStatus {
    pub id: u32,
    #[serde(default)]
    pub description: String,
}

impl JudgeStatus {
    pub const IN_QUEUE: u32 = 1;
    pub const PROCESSING: u32 = 2;
    pub const ACCEPTED: u32 = 3;
    pub const TIME_LIMIT_EXCEEDED: u32 = 5;

    pub fn new(id: u32, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }

    pub fn accepted() -> Self {
        Self::new(Self::ACCEPTED, "Accepted")
    }

    pub fn is_terminal(&self) -> bool {
        self.id > Self::PROCESSING
    }

    pub fn is_accepted(&self) -> bool {
        self.id == Self::ACCEPTED
    }
}

/// What the judge is asked to run
/// Built per call, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionSpec {
    pub source_code: String,
    pub language_id: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdin: String,
    /// Seconds
    pub cpu_time_limit: u64,
    /// KB
    pub memory_limit: u64,
}

/// Opaque token for a pending submission
///
/// Not `Clone`: a handle belongs to exactly one wait and is dropped
/// with it, whether the wait ends in a result or a timeout.
#[derive(Debug, PartialEq, Eq)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw result as reported by the judge (or shaped like it by the local fallback)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawJudgeResult {
    pub status: JudgeStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stdout: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stderr: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub compile_output: String,
    /// Wall time in seconds, as the judge formats it
    #[serde(default)]
    pub time: Option<String>,
    /// KB
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub exit_signal: Option<i32>,
}

impl RawJudgeResult {
    pub fn with_status(status: JudgeStatus) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: String::new(),
            compile_output: String::new(),
            time: None,
            memory: None,
            exit_code: None,
            exit_signal: None,
        }
    }
}

// Judge0 sends `null` for streams that produced nothing
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct SubmissionToken {
    token: String,
}

/// Judge client trait
///
/// Implementations provide the two protocol calls; the wait loop is shared.
/// Implementations hold immutable configuration only and are safe to share
/// across concurrent requests.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Enqueue a submission and return its handle
    /// The judge runs it asynchronously; no result is returned here
    async fn submit(&self, spec: &SubmissionSpec) -> Result<JobHandle, JudgeError>;

    /// Fetch the current state of a submission, once
    async fn poll(&self, handle: &JobHandle) -> Result<RawJudgeResult, JudgeError>;

    /// Whether a judge is configured at all (no network)
    fn is_available(&self) -> bool;

    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// Submit, then poll until the judge reports a terminal status
    ///
    /// ## Termination
    /// * terminal status → `Ok(result)`
    /// * `deadline` elapsed → `JudgeError::Timeout`, never earlier than the deadline
    /// * `cancel` fired → `JudgeError::Cancelled`
    ///
    /// Deadline and cancellation also abort an in-flight submit or poll.
    /// The first poll happens one interval after the submit returns.
    async fn submit_and_wait(
        &self,
        spec: &SubmissionSpec,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<RawJudgeResult, JudgeError> {
        let deadline_at = Instant::now() + deadline;

        let handle = bounded(self.submit(spec), deadline_at, deadline, cancel).await?;
        debug!(token = %handle, "Submission enqueued");

        let interval = self.poll_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            bounded(
                async {
                    ticker.tick().await;
                    Ok(())
                },
                deadline_at,
                deadline,
                cancel,
            )
            .await?;

            let result = bounded(self.poll(&handle), deadline_at, deadline, cancel).await?;

            if result.status.is_terminal() {
                debug!(
                    token = %handle,
                    status = result.status.id,
                    description = %result.status.description,
                    "Submission finished"
                );
                return Ok(result);
            }

            trace!(token = %handle, status = result.status.id, "Submission still pending");
        }
    }
}

/// Race a judge call against the deadline and the cancellation token
async fn bounded<T, F>(
    fut: F,
    deadline_at: Instant,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<T, JudgeError>
where
    F: Future<Output = Result<T, JudgeError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(JudgeError::Cancelled),
        _ = tokio::time::sleep_until(deadline_at) => {
            warn!(deadline_ms = deadline.as_millis() as u64, "Timed out waiting for judge result");
            Err(JudgeError::Timeout(deadline))
        }
        result = fut => result,
    }
}

/// HTTP implementation of the Judge0 protocol
#[derive(Debug, Clone)]
pub struct HttpJudgeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl HttpJudgeClient {
    /// Create a client with default request timeout and poll interval
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, JudgeError> {
        Self::build(
            base_url.into(),
            api_key.into(),
            Duration::from_secs(30),
            DEFAULT_POLL_INTERVAL,
        )
    }

    pub fn from_config(config: &Config) -> Result<Self, JudgeError> {
        Self::build(
            config.judge_url.clone(),
            config.judge_api_key.clone(),
            config.request_timeout(),
            config.poll_interval(),
        )
    }

    fn build(
        base_url: String,
        api_key: String,
        request_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, JudgeError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: Some(api_key).filter(|k| !k.is_empty()),
            poll_interval,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request
                .header("X-RapidAPI-Key", key)
                .header("X-RapidAPI-Host", RAPIDAPI_HOST),
            None => request,
        }
    }

    /// Check status, then decode the body
    /// The body is read as text first so a malformed payload is a decode error,
    /// not a transport error
    async fn read_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, JudgeError> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "could not read error body".to_string());
            return Err(JudgeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl JudgeClient for HttpJudgeClient {
    #[instrument(skip(self, spec), fields(language_id = spec.language_id))]
    async fn submit(&self, spec: &SubmissionSpec) -> Result<JobHandle, JudgeError> {
        let url = format!("{}/submissions?base64_encoded=false&wait=false", self.base_url);

        let response = self.authorize(self.client.post(&url).json(spec)).send().await?;
        let token: SubmissionToken = Self::read_body(response).await?;

        Ok(JobHandle::new(token.token))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<RawJudgeResult, JudgeError> {
        let url = format!(
            "{}/submissions/{}?base64_encoded=false",
            self.base_url,
            handle.token()
        );

        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::read_body(response).await
    }

    fn is_available(&self) -> bool {
        !self.base_url.is_empty()
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
