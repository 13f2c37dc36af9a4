use std::time::Duration;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::errors::ProviderError;
use crate::models::features::GeoPoint;
use crate::models::weather::{
    OpenMeteoDaily, OpenMeteoHourly, OpenMeteoResponse, ProviderForecast, RawDailyRecord,
    RawHourlyRecord,
};
use crate::services::feature_aggregator::parse_instant;

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

const HOURLY_VARS: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "dewpoint_2m",
    "pressure_msl",
    "precipitation",
    "precipitation_probability",
    "cloudcover",
    "shortwave_radiation",
    "direct_normal_irradiance",
    "diffuse_radiation",
    "windspeed_10m",
    "winddirection_10m",
    "windgusts_10m",
    "visibility",
];

const DAILY_VARS: &[&str] = &[
    "sunrise",
    "sunset",
    "sunshine_duration",
    "precipitation_sum",
    "precipitation_probability_max",
    "temperature_2m_max",
    "temperature_2m_min",
    "wind_speed_10m_max",
];

/// Open-Meteo forecast client
pub struct OpenMeteoClient {
    client: Client,
    url: String,
}

impl OpenMeteoClient {
    /// Returns a new client
    ///
    /// # Arguments
    ///
    /// * 'url' - forecast endpoint, normally [`OPEN_METEO_URL`]
    pub fn new(url: &str) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self { client, url: url.to_string() })
    }

    /// Fetches hourly and daily forecast for a location, hourly records
    /// truncated to `[now_hour, now_hour + hourly_horizon_h]`.
    pub async fn fetch_forecast(
        &self,
        point: &GeoPoint,
        cfg: &ProviderConfig,
        now: DateTime<Utc>,
    ) -> Result<ProviderForecast, ProviderError> {
        let (temp_unit, wind_unit) = if cfg.units == "metric" { ("celsius", "ms") } else { ("fahrenheit", "mph") };
        let params: Vec<(&str, String)> = vec![
            ("latitude", point.latitude().to_string()),
            ("longitude", point.longitude().to_string()),
            ("hourly", HOURLY_VARS.join(",")),
            ("daily", DAILY_VARS.join(",")),
            ("timezone", "UTC".to_string()),
            ("temperature_unit", temp_unit.to_string()),
            ("windspeed_unit", wind_unit.to_string()),
            ("forecast_days", cfg.forecast_days.clamp(1, 16).to_string()),
        ];

        let resp = self.client.get(&self.url).query(&params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let body = resp.text().await?;
        let parsed: OpenMeteoResponse = serde_json::from_str(&body)?;
        debug!(hourly = parsed.hourly.time.len(), daily = parsed.daily.time.len(), "open-meteo response decoded");

        Ok(ProviderForecast {
            issue_time_utc: now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            hourly: within_horizon(transpose_hourly(parsed.hourly), now, cfg.hourly_horizon_h),
            daily: transpose_daily(parsed.daily),
        })
    }
}

fn iso_z(ts: &str) -> String {
    if ts.ends_with('Z') { ts.to_string() } else { format!("{ts}Z") }
}

fn column<T: Clone>(col: &[Option<T>], i: usize) -> Option<T> {
    col.get(i).cloned().flatten()
}

pub fn transpose_hourly(h: OpenMeteoHourly) -> Vec<RawHourlyRecord> {
    h.time
        .iter()
        .enumerate()
        .map(|(i, t)| RawHourlyRecord {
            ts_utc: iso_z(t),
            temp_2m_c: column(&h.temperature_2m, i),
            relative_humidity_pct: column(&h.relative_humidity_2m, i),
            dew_point_c: column(&h.dewpoint_2m, i),
            mslp_hpa: column(&h.pressure_msl, i),
            precip_mm: column(&h.precipitation, i),
            precip_probability_pct: column(&h.precipitation_probability, i),
            cloud_cover_pct: column(&h.cloudcover, i),
            ghi_w_m2: column(&h.shortwave_radiation, i),
            dni_w_m2: column(&h.direct_normal_irradiance, i),
            dhi_w_m2: column(&h.diffuse_radiation, i),
            wind_speed_10m_ms: column(&h.windspeed_10m, i),
            wind_dir_10m_deg: column(&h.winddirection_10m, i),
            wind_gust_10m_ms: column(&h.windgusts_10m, i),
            visibility_m: column(&h.visibility, i),
        })
        .collect()
}

pub fn transpose_daily(d: OpenMeteoDaily) -> Vec<RawDailyRecord> {
    d.time
        .iter()
        .enumerate()
        .map(|(i, date)| RawDailyRecord {
            date_utc: date.clone(),
            sunrise: column(&d.sunrise, i).map(|s| iso_z(&s)),
            sunset: column(&d.sunset, i).map(|s| iso_z(&s)),
            sunshine_duration_s: column(&d.sunshine_duration, i),
            precip_day_total_mm: column(&d.precipitation_sum, i),
            precip_probability_max_pct: column(&d.precipitation_probability_max, i),
            temp_day_max_c: column(&d.temperature_2m_max, i),
            temp_day_min_c: column(&d.temperature_2m_min, i),
            wind_day_max_ms: column(&d.wind_speed_10m_max, i),
        })
        .collect()
}

/// Keeps hours in `[now truncated to the hour, + horizon_h]`.
pub fn within_horizon(hourly: Vec<RawHourlyRecord>, now: DateTime<Utc>, horizon_h: u32) -> Vec<RawHourlyRecord> {
    let start = now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now);
    let end = start + TimeDelta::hours(i64::from(horizon_h));
    hourly
        .into_iter()
        .filter(|h| match parse_instant(&h.ts_utc) {
            Ok(ts) => start <= ts && ts <= end,
            Err(e) => {
                warn!(error = %e, "dropping provider hour");
                false
            }
        })
        .collect()
}
