use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::FeatureError;
use crate::models::weather::RawHourlyRecord;

// ─── Location ────────────────────────────────────────────────────────────────

/// Validated observer location. Construct through [`GeoPoint::new`] so that
/// NaN or out-of-range coordinates never reach the irradiance chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, FeatureError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(FeatureError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(FeatureError::InvalidLongitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

// ─── Derived per-hour features ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SolarGeometry {
    /// Apparent solar elevation above the horizon (deg), negative at night
    #[serde(rename = "sun_elevation_deg")]
    pub elevation_deg: f64,
    /// Solar azimuth, clockwise from north (deg)
    #[serde(rename = "sun_azimuth_deg")]
    pub azimuth_deg: f64,
    /// max(0, 90 - elevation)
    #[serde(rename = "sun_zenith_deg")]
    pub zenith_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DerivedHourlyFeatures {
    #[serde(flatten)]
    pub geometry: SolarGeometry,
    /// Haurwitz clear-sky GHI (W/m²)
    pub ghi_cs_w_m2: f64,
    /// GHI / GHI_cs, clamped to [0, 2]
    pub k_ghi: f64,
    /// DNI over the clear-sky beam proxy GHI_cs / cosZ, clamped to [0, 2]
    pub k_dni: f64,
    pub sunshine_duration_s_hour: f64,
    pub dni_w_m2: f64,
    pub dhi_w_m2: f64,
}

// ─── Combined hourly record (metadata + raw + derived) ───────────────────────

/// Per-cycle identity stamped on every emitted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordMeta {
    pub provider: String,
    pub provider_model: String,
    pub site_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub data_version: String,
}

/// The record handed to the log writer, the MQTT publisher and the API.
/// Numeric fields are never null; absent provider values are emitted as 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HourlyRecord {
    pub ts_utc: String,
    #[serde(flatten)]
    pub meta: RecordMeta,

    // ── Provider fields ──────────────────────────────────────────────────────
    pub ghi_w_m2: f64,
    pub cloud_cover_pct: f64,
    pub temp_2m_c: f64,
    pub relative_humidity_pct: f64,
    pub dew_point_c: f64,
    pub mslp_hpa: f64,
    pub precip_mm: f64,
    pub precip_probability_pct: f64,
    pub wind_speed_10m_ms: f64,
    pub wind_dir_10m_deg: f64,
    pub wind_gust_10m_ms: f64,
    pub visibility_m: f64,

    // ── Decomposition-owned fields (derived wins) ────────────────────────────
    pub dni_w_m2: f64,
    pub dhi_w_m2: f64,

    // ── Derived ──────────────────────────────────────────────────────────────
    #[serde(flatten)]
    pub geometry: SolarGeometry,
    pub ghi_cs_w_m2: f64,
    pub k_ghi: f64,
    pub k_dni: f64,
    pub sunshine_duration_s_hour: f64,
}

impl HourlyRecord {
    /// Merges one raw provider hour with its derived features. Only the
    /// irradiance components, clearness indices and sunshine duration come
    /// from `derived`; every other provider field is copied as-is.
    pub fn new(meta: &RecordMeta, raw: &RawHourlyRecord, derived: &DerivedHourlyFeatures) -> Self {
        let or_zero = |v: Option<f64>| v.unwrap_or(0.0);
        Self {
            ts_utc: raw.ts_utc.clone(),
            meta: meta.clone(),
            ghi_w_m2: or_zero(raw.ghi_w_m2),
            cloud_cover_pct: or_zero(raw.cloud_cover_pct),
            temp_2m_c: or_zero(raw.temp_2m_c),
            relative_humidity_pct: or_zero(raw.relative_humidity_pct),
            dew_point_c: or_zero(raw.dew_point_c),
            mslp_hpa: or_zero(raw.mslp_hpa),
            precip_mm: or_zero(raw.precip_mm),
            precip_probability_pct: or_zero(raw.precip_probability_pct),
            wind_speed_10m_ms: or_zero(raw.wind_speed_10m_ms),
            wind_dir_10m_deg: or_zero(raw.wind_dir_10m_deg),
            wind_gust_10m_ms: or_zero(raw.wind_gust_10m_ms),
            visibility_m: or_zero(raw.visibility_m),
            dni_w_m2: derived.dni_w_m2,
            dhi_w_m2: derived.dhi_w_m2,
            geometry: derived.geometry,
            ghi_cs_w_m2: derived.ghi_cs_w_m2,
            k_ghi: derived.k_ghi,
            k_dni: derived.k_dni,
            sunshine_duration_s_hour: derived.sunshine_duration_s_hour,
        }
    }

    /// `YYYY-MM-DD` grouping key: the first 10 characters of the instant.
    pub fn date_key(&self) -> &str {
        self.ts_utc.get(..10).unwrap_or(&self.ts_utc)
    }
}

// ─── Daily aggregate ─────────────────────────────────────────────────────────

/// PV parameters recorded next to each daily aggregate. Tilt is recorded only;
/// no plane-of-array model consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PvSnapshot {
    pub pv_capacity_kw: f64,
    pub tilt_deg: f64,
    pub albedo: f64,
    pub gamma_p_pct_per_c: f64,
    pub noct_cell_temp_c: f64,
    pub inverter_ac_limit_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyAggregate {
    pub date_utc: String,
    #[serde(flatten)]
    pub meta: RecordMeta,

    // ── Provider daily fields (null when the provider has no such day) ──────
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub temp_day_max_c: Option<f64>,
    pub temp_day_min_c: Option<f64>,
    pub precip_day_total_mm: Option<f64>,
    pub precip_probability_max_pct: Option<f64>,
    pub wind_day_max_ms: Option<f64>,

    // ── Folded from the hourly records ───────────────────────────────────────
    /// Provider value when non-zero, else the summed hourly estimate
    pub sunshine_duration_s: f64,
    /// Σ GHI × 3600 / 1e6 over the day's hours (MJ/m²)
    pub ghi_daily_total_mj_m2: f64,
    pub cloud_cover_day_mean_pct: f64,
    pub hours_count: usize,

    #[serde(flatten)]
    pub pv: PvSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_point_rejects_nan_and_out_of_range() {
        assert!(matches!(GeoPoint::new(f64::NAN, 0.0), Err(FeatureError::InvalidLatitude(_))));
        assert!(matches!(GeoPoint::new(91.0, 0.0), Err(FeatureError::InvalidLatitude(_))));
        assert!(matches!(GeoPoint::new(0.0, f64::INFINITY), Err(FeatureError::InvalidLongitude(_))));
        assert!(matches!(GeoPoint::new(0.0, -180.5), Err(FeatureError::InvalidLongitude(_))));
        let p = GeoPoint::new(-90.0, 180.0).unwrap();
        assert_eq!(p.latitude(), -90.0);
        assert_eq!(p.longitude(), 180.0);
    }

    #[test]
    fn hourly_record_keeps_raw_passengers_and_zero_fills() {
        let meta = RecordMeta {
            provider: "open-meteo".into(),
            provider_model: "auto".into(),
            site_id: "roof".into(),
            latitude: 45.0,
            longitude: 7.0,
            timezone: "UTC".into(),
            data_version: "1.0".into(),
        };
        let raw = RawHourlyRecord {
            ts_utc: "2024-06-01T10:00:00Z".into(),
            ghi_w_m2: Some(640.0),
            dni_w_m2: Some(1.0),
            temp_2m_c: Some(21.5),
            ..Default::default()
        };
        let derived = DerivedHourlyFeatures {
            geometry: SolarGeometry { elevation_deg: 60.0, azimuth_deg: 150.0, zenith_deg: 30.0 },
            ghi_cs_w_m2: 900.0,
            k_ghi: 0.71,
            k_dni: 0.5,
            sunshine_duration_s_hour: 3600.0,
            dni_w_m2: 420.0,
            dhi_w_m2: 180.0,
        };

        let rec = HourlyRecord::new(&meta, &raw, &derived);
        assert_eq!(rec.ghi_w_m2, 640.0);
        assert_eq!(rec.temp_2m_c, 21.5);
        assert_eq!(rec.cloud_cover_pct, 0.0);
        assert_eq!(rec.visibility_m, 0.0);
        assert_eq!(rec.dni_w_m2, 420.0);
        assert_eq!(rec.dhi_w_m2, 180.0);
        assert_eq!(rec.date_key(), "2024-06-01");

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["sun_zenith_deg"], 30.0);
        assert_eq!(json["site_id"], "roof");
        assert_eq!(json["k_ghi"], 0.71);
    }
}
