use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::{ProviderConfig, SiteConfig};
use crate::models::features::{DailyAggregate, HourlyRecord, PvSnapshot};

// ─── Forecast views ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct NowResponse {
    pub timestamp: DateTime<Utc>,
    pub cycle: u64,
    /// Current-hour record, null before the first cycle or past the horizon
    pub record: Option<HourlyRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HourlyResponse {
    pub cycle: u64,
    pub issue_time_utc: String,
    pub records: Vec<HourlyRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailySeriesPoint {
    pub date_utc: String,
    pub ghi_daily_total_mj_m2: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailyResponse {
    pub cycle: u64,
    pub series: Vec<DailySeriesPoint>,
    pub today: Option<DailyAggregate>,
    pub tomorrow: Option<DailyAggregate>,
}

// ─── Site & service ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct SiteInfo {
    pub site: SiteConfig,
    pub provider: ProviderConfig,
    pub pv: PvSnapshot,
    /// Seconds between forecast cycles
    pub update_interval_s: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_s: u64,
    /// Completed cycles, 0 until the first fetch succeeds
    pub cycle: u64,
    pub last_issue_time_utc: Option<String>,
    pub mqtt_connected: bool,
}
