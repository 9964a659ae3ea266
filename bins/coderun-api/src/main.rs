mod error;
mod handlers;
mod metrics;
mod rate_limit;
mod routes;

use anyhow::Context;
use axum::Router;
use coderun_common::Config;
use coderun_judge::Executor;
use redis::aio::ConnectionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct AppState {
    pub executor: Executor,
    pub redis: ConnectionManager,
    /// Cancelled on shutdown; aborts in-flight executions
    pub shutdown: CancellationToken,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("coderun API booting...");

    metrics::init_metrics().context("Failed to register metrics")?;

    let config = Config::from_env();

    let executor = Executor::from_config(&config).context("Failed to build judge client")?;
    if executor.judge_available() {
        info!(judge_url = %config.judge_url, "Judge configured");
    }

    let client = redis::Client::open(config.redis_url.as_str())
        .context("Failed to create Redis client")?;
    let redis_conn = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;

    info!("Connected to Redis: {}", config.redis_url);

    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState {
        executor,
        redis: redis_conn,
        shutdown: shutdown.clone(),
    });

    let app = Router::new()
        .merge(routes::routes(config.rate_limit_execute))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, service)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Shutdown signal received - cancelling in-flight executions");
            }
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    info!("coderun API stopped");
    Ok(())
}
