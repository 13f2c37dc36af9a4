use axum::{routing::get, Router};

use crate::controllers::forecast_controller::{get_daily, get_health, get_hourly, get_now, get_site};
use crate::shared_state::SharedState;

/// Build the `/api/*` sub-router.
pub fn api_routes(shared: SharedState) -> Router {
    Router::new()
        .route("/now",    get(get_now))
        .route("/hourly", get(get_hourly))
        .route("/daily",  get(get_daily))
        .route("/site",   get(get_site))
        .route("/health", get(get_health))
        .with_state(shared)
}
