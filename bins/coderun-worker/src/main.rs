mod runner;

use anyhow::Context;
use coderun_common::redis;
use coderun_common::Config;
use coderun_judge::Executor;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    info!("coderun worker booting...");

    let config = Config::from_env();
    let executor = Executor::from_config(&config).context("Failed to build judge client")?;

    info!(
        judge_available = executor.judge_available(),
        local_fallback = config.local_fallback_enabled,
        timeout_ms = config.execution_timeout_ms,
        "Executor configured"
    );

    let client = ::redis::Client::open(config.redis_url.as_str())
        .context("Failed to create Redis client")?;
    let mut redis_conn = ::redis::aio::ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;

    info!("Connected to Redis: {}", config.redis_url);
    info!("Queue: {}", redis::QUEUE_KEY);

    // Ctrl-C cancels the in-flight job; the loop exits after recording it.
    // A job popped after the signal goes back to the queue unstarted.
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => warn!("Received shutdown signal, finishing current job..."),
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
        trigger.cancel();
    });

    worker_loop(&mut redis_conn, &executor, &shutdown).await;

    info!("Worker shutdown complete");
    Ok(())
}

#[instrument(skip_all)]
async fn worker_loop(
    redis_conn: &mut ::redis::aio::ConnectionManager,
    executor: &Executor,
    shutdown: &CancellationToken,
) {
    while !shutdown.is_cancelled() {
        // BLPOP with 5 second timeout so shutdown is observed
        match redis::pop_job(redis_conn, 5.0).await {
            Ok(Some(job)) => {
                let job_id = job.id;
                info!(
                    job_id = %job_id,
                    language = %job.request.language,
                    test_cases = job.request.test_cases.len(),
                    source_size = job.request.code.len(),
                    "Received job"
                );

                if runner::handle_job(redis_conn, executor, &job, shutdown).await
                    == runner::Handled::Requeued
                {
                    break;
                }
            }
            Ok(None) => continue,
            Err(e) => {
                error!(error = %e, "Redis error");
                tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
            }
        }
    }
}
