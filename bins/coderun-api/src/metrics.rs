// Prometheus metrics for the coderun API

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Synchronous executions (language, outcome = passed | failed | error)
    pub static ref EXECUTIONS: CounterVec = CounterVec::new(
        Opts::new("coderun_executions_total", "Total synchronous executions"),
        &["language", "outcome"]
    )
    .expect("metric can be created");

    pub static ref EXECUTION_TIME: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "coderun_execution_time_ms",
            "Execution time in milliseconds"
        )
        .buckets(vec![50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]),
        &["language"]
    )
    .expect("metric can be created");

    pub static ref JOBS_SUBMITTED: CounterVec = CounterVec::new(
        Opts::new("coderun_jobs_submitted_total", "Total asynchronous jobs queued"),
        &["language"]
    )
    .expect("metric can be created");

    pub static ref REQUESTS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("coderun_requests_rejected_total", "Total requests rejected before execution"),
        &["reason"]
    )
    .expect("metric can be created");
}

/// Register all collectors with the registry
pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(EXECUTIONS.clone()))?;
    REGISTRY.register(Box::new(EXECUTION_TIME.clone()))?;
    REGISTRY.register(Box::new(JOBS_SUBMITTED.clone()))?;
    REGISTRY.register(Box::new(REQUESTS_REJECTED.clone()))?;
    Ok(())
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn record_execution(language: &str, outcome: &str, execution_time_ms: u64) {
    EXECUTIONS.with_label_values(&[language, outcome]).inc();
    EXECUTION_TIME
        .with_label_values(&[language])
        .observe(execution_time_ms as f64);
}

pub fn record_job_submitted(language: &str) {
    JOBS_SUBMITTED.with_label_values(&[language]).inc();
}

pub fn record_rejected(reason: &str) {
    REQUESTS_REJECTED.with_label_values(&[reason]).inc();
}
