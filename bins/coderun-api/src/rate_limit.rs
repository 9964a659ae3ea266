// Per-client throttling for the execution endpoints

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::{info, warn};

const WINDOW: Duration = Duration::from_secs(60 * 60);

/// Limit every route of `router` to `per_hour` requests per client IP
///
/// The whole hourly allowance is available as a burst and refills evenly
/// over the hour. Clients are keyed by `ConnectInfo<SocketAddr>`, so the
/// server must be started with `into_make_service_with_connect_info`.
/// `per_hour == 0` leaves the router unlimited.
pub fn per_ip_hourly<S>(router: Router<S>, per_hour: u64) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if per_hour == 0 {
        warn!("Execution rate limit disabled");
        return router;
    }

    let burst = u32::try_from(per_hour).unwrap_or(u32::MAX);
    let refill_ms = (WINDOW.as_millis() as u64 / per_hour).max(1);

    let config = GovernorConfigBuilder::default()
        .per_millisecond(refill_ms)
        .burst_size(burst)
        .finish();

    match config {
        Some(config) => {
            info!(per_hour, "Execution rate limit enabled");
            router.layer(GovernorLayer {
                config: Arc::new(config),
            })
        }
        None => {
            warn!(per_hour, "Invalid rate limit configuration - running unlimited");
            router
        }
    }
}
