use axum::{extract::State, response::IntoResponse, Json};
use chrono::{TimeDelta, Utc};

use crate::config::Config;
use crate::models::api::{
    DailyResponse, DailySeriesPoint, HealthResponse, HourlyResponse, NowResponse, SiteInfo,
};
use crate::shared_state::AppState;

/// GET /api/now
/// Current-hour forecast record
///
/// Returns the first hourly record at or after the current hour, or null when
/// no cycle has completed yet.
#[utoipa::path(
    get,
    path = "/api/now",
    responses(
        (status = 200, description = "Current-hour record", body = NowResponse)
    )
)]
pub async fn get_now(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();
    let snapshot = state.get_snapshot();
    Json(NowResponse {
        timestamp: now,
        cycle: snapshot.cycle,
        record: snapshot.current_hour(now).cloned(),
    })
}

/// GET /api/hourly
/// All hourly records of the latest cycle
#[utoipa::path(
    get,
    path = "/api/hourly",
    responses(
        (status = 200, description = "Hourly records within the forecast horizon", body = HourlyResponse)
    )
)]
pub async fn get_hourly(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.get_snapshot();
    Json(HourlyResponse {
        cycle: snapshot.cycle,
        issue_time_utc: snapshot.issue_time_utc,
        records: snapshot.hourly,
    })
}

/// GET /api/daily
/// Daily GHI series plus today's and tomorrow's aggregates
#[utoipa::path(
    get,
    path = "/api/daily",
    responses(
        (status = 200, description = "Daily aggregates", body = DailyResponse)
    )
)]
pub async fn get_daily(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.get_snapshot();
    let today = Utc::now().date_naive();
    let series = snapshot
        .daily
        .iter()
        .map(|d| DailySeriesPoint {
            date_utc: d.date_utc.clone(),
            ghi_daily_total_mj_m2: d.ghi_daily_total_mj_m2,
        })
        .collect();
    Json(DailyResponse {
        cycle: snapshot.cycle,
        series,
        today: snapshot.day(today).cloned(),
        tomorrow: snapshot.day(today + TimeDelta::days(1)).cloned(),
    })
}

/// GET /api/site
/// Site, provider and PV configuration
///
/// The provider API key is never included.
#[utoipa::path(
    get,
    path = "/api/site",
    responses(
        (status = 200, description = "Site configuration summary", body = SiteInfo)
    )
)]
pub async fn get_site(State(config): State<Config>) -> impl IntoResponse {
    Json(SiteInfo {
        pv: config.pv.snapshot(),
        site: config.site,
        provider: config.provider,
        update_interval_s: config.app.update_interval,
    })
}

/// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.get_snapshot();
    Json(HealthResponse {
        status: "ok".into(),
        uptime_s: state.started_at.elapsed().as_secs(),
        cycle: snapshot.cycle,
        last_issue_time_utc: (snapshot.cycle > 0).then_some(snapshot.issue_time_utc),
        mqtt_connected: state.is_mqtt_connected(),
    })
}
