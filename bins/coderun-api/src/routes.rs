// Route definitions for the coderun API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, rate_limit, AppState};

/// All routes; the two execution endpoints share a per-IP hourly limit
pub fn routes(rate_limit_per_hour: u64) -> Router<Arc<AppState>> {
    let execution = Router::new()
        .route("/api/code/execute", post(handlers::execute_code))
        .route("/api/code/jobs", post(handlers::submit_job));

    Router::new()
        .merge(rate_limit::per_ip_hourly(execution, rate_limit_per_hour))
        .route("/api/code/jobs/:job_id", get(handlers::get_job))
        .route("/api/code/languages", get(handlers::list_languages))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
}
