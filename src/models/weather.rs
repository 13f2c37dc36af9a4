use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Provider records (hourly / daily) ──────────────────────────────────────

/// One forecast hour as delivered by the weather provider.
/// Every numeric field is optional; absent values resolve to 0.0 downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RawHourlyRecord {
    /// ISO-8601 UTC instant, second precision, usually suffixed `Z`
    pub ts_utc: String,
    /// Global horizontal irradiance (W/m²)
    pub ghi_w_m2: Option<f64>,
    /// Direct normal irradiance (W/m²)
    pub dni_w_m2: Option<f64>,
    /// Diffuse horizontal irradiance (W/m²)
    pub dhi_w_m2: Option<f64>,
    pub cloud_cover_pct: Option<f64>,

    // ── Passenger fields ─────────────────────────────────────────────────────
    pub temp_2m_c: Option<f64>,
    pub relative_humidity_pct: Option<f64>,
    pub dew_point_c: Option<f64>,
    pub mslp_hpa: Option<f64>,
    pub precip_mm: Option<f64>,
    pub precip_probability_pct: Option<f64>,
    pub wind_speed_10m_ms: Option<f64>,
    pub wind_dir_10m_deg: Option<f64>,
    pub wind_gust_10m_ms: Option<f64>,
    pub visibility_m: Option<f64>,
}

/// One calendar day as delivered by the weather provider. All fields null-safe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RawDailyRecord {
    /// `YYYY-MM-DD`
    pub date_utc: String,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub sunshine_duration_s: Option<f64>,
    pub precip_day_total_mm: Option<f64>,
    pub precip_probability_max_pct: Option<f64>,
    pub temp_day_max_c: Option<f64>,
    pub temp_day_min_c: Option<f64>,
    pub wind_day_max_ms: Option<f64>,
}

/// Output of one provider fetch.
#[derive(Debug, Clone, Default)]
pub struct ProviderForecast {
    pub issue_time_utc: String,
    pub hourly: Vec<RawHourlyRecord>,
    pub daily: Vec<RawDailyRecord>,
}

// ─── Open-Meteo wire types ────────────────────────────────────────────────────
// Open-Meteo answers column-oriented: one array per variable, aligned on `time`.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenMeteoResponse {
    pub hourly: OpenMeteoHourly,
    pub daily: OpenMeteoDaily,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenMeteoHourly {
    pub time: Vec<String>,
    pub temperature_2m: Vec<Option<f64>>,
    pub relative_humidity_2m: Vec<Option<f64>>,
    pub dewpoint_2m: Vec<Option<f64>>,
    pub pressure_msl: Vec<Option<f64>>,
    pub precipitation: Vec<Option<f64>>,
    pub precipitation_probability: Vec<Option<f64>>,
    pub cloudcover: Vec<Option<f64>>,
    pub shortwave_radiation: Vec<Option<f64>>,
    pub direct_normal_irradiance: Vec<Option<f64>>,
    pub diffuse_radiation: Vec<Option<f64>>,
    pub windspeed_10m: Vec<Option<f64>>,
    pub winddirection_10m: Vec<Option<f64>>,
    pub windgusts_10m: Vec<Option<f64>>,
    pub visibility: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenMeteoDaily {
    pub time: Vec<String>,
    pub sunrise: Vec<Option<String>>,
    pub sunset: Vec<Option<String>>,
    pub sunshine_duration: Vec<Option<f64>>,
    pub precipitation_sum: Vec<Option<f64>>,
    pub precipitation_probability_max: Vec<Option<f64>>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
    pub wind_speed_10m_max: Vec<Option<f64>>,
}
