/// ============================================================
///  Feature aggregation
///
///  Hourly:  raw record → solar geometry → GHI₀ / GHI_cs →
///           decomposition (or provider pass-through) →
///           clearness indices → sunshine duration
///  Daily:   group hourly records by UTC date key, integrate GHI,
///           average cloud cover, sum sunshine, merge provider day
/// ============================================================

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::errors::FeatureError;
use crate::models::features::{
    DailyAggregate, DerivedHourlyFeatures, GeoPoint, HourlyRecord, PvSnapshot, RecordMeta,
};
use crate::models::weather::{RawDailyRecord, RawHourlyRecord};
use crate::services::decomposition::decompose_or_pass_through;
use crate::services::irradiance::{
    clearsky_ghi_haurwitz, cos_zenith, extraterrestrial_horizontal, COS_ZENITH_EPS,
};
use crate::services::solar_position::solar_geometry;
use crate::services::sunshine::{sunshine_duration_hour_from_ghi, SUNSHINE_THRESHOLD_W_M2};

/// Upper bound applied to both clearness indices.
const CLEARNESS_INDEX_MAX: f64 = 2.0;

/// Parses a provider instant: RFC 3339, or `YYYY-MM-DDTHH:MM[:SS]` with an
/// optional trailing `Z`, always interpreted as UTC.
pub fn parse_instant(ts: &str) -> Result<DateTime<Utc>, FeatureError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = ts.strip_suffix('Z').unwrap_or(ts);
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|n| n.and_utc())
        .ok_or_else(|| FeatureError::InvalidInstant(ts.to_string()))
}

// ─── Hourly stage ────────────────────────────────────────────────────────────

pub fn derive_hourly_features(
    point: &GeoPoint,
    when: DateTime<Utc>,
    raw: &RawHourlyRecord,
) -> DerivedHourlyFeatures {
    let geometry = solar_geometry(point, when);
    let zen = geometry.zenith_deg;
    let ghi0 = extraterrestrial_horizontal(when, zen);
    let ghi_cs = clearsky_ghi_haurwitz(zen);

    let ghi = raw.ghi_w_m2.unwrap_or(0.0);
    let parts = decompose_or_pass_through(raw.dni_w_m2, raw.dhi_w_m2, ghi, ghi0, zen);

    let cosz = cos_zenith(zen);
    let k_ghi = if ghi_cs > 0.0 { ghi / ghi_cs } else { 0.0 };
    // DNI over the clear-sky beam proxy GHI_cs / cosZ
    let k_dni = if ghi_cs > 0.0 && cosz > 0.0 {
        parts.dni_w_m2 / (ghi_cs / cosz.max(COS_ZENITH_EPS))
    } else {
        0.0
    };

    DerivedHourlyFeatures {
        geometry,
        ghi_cs_w_m2: ghi_cs,
        k_ghi: k_ghi.clamp(0.0, CLEARNESS_INDEX_MAX),
        k_dni: k_dni.clamp(0.0, CLEARNESS_INDEX_MAX),
        sunshine_duration_s_hour: sunshine_duration_hour_from_ghi(raw.ghi_w_m2, SUNSHINE_THRESHOLD_W_M2),
        dni_w_m2: parts.dni_w_m2,
        dhi_w_m2: parts.dhi_w_m2,
    }
}

/// Derives and merges every provider hour. Hours whose instant cannot be
/// parsed are logged and skipped; the rest of the batch is unaffected.
/// `ts_utc` is rewritten as `YYYY-MM-DDTHH:MM:SSZ` so the date key is the
/// UTC date the geometry was computed for.
pub fn derive_hourly_records(
    point: &GeoPoint,
    meta: &RecordMeta,
    raw_hours: &[RawHourlyRecord],
) -> Vec<HourlyRecord> {
    raw_hours
        .iter()
        .filter_map(|raw| match parse_instant(&raw.ts_utc) {
            Ok(when) => {
                let derived = derive_hourly_features(point, when, raw);
                Some(HourlyRecord {
                    ts_utc: when.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                    ..HourlyRecord::new(meta, raw, &derived)
                })
            }
            Err(e) => {
                warn!(error = %e, "skipping provider hour");
                None
            }
        })
        .collect()
}

// ─── Daily stage ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct DayFold {
    ghi_mj_m2: f64,
    cloud_sum: f64,
    sunshine_s: f64,
    hours: usize,
}

/// Folds hourly records into one aggregate per UTC date key present in
/// `hourly`. Output is sorted by date; callers must not rely on it.
pub fn aggregate_daily(
    hourly: &[HourlyRecord],
    provider_daily: &[RawDailyRecord],
    meta: &RecordMeta,
    pv: &PvSnapshot,
) -> Vec<DailyAggregate> {
    let mut by_day: BTreeMap<&str, DayFold> = BTreeMap::new();
    for r in hourly {
        let fold = by_day.entry(r.date_key()).or_default();
        fold.ghi_mj_m2 += r.ghi_w_m2 * 3600.0 / 1e6;
        fold.cloud_sum += r.cloud_cover_pct;
        fold.sunshine_s += r.sunshine_duration_s_hour;
        fold.hours += 1;
    }

    by_day
        .into_iter()
        .map(|(day, fold)| {
            let provider = provider_daily.iter().find(|d| d.date_utc == day);
            if provider.is_none() {
                debug!(date = day, "no provider daily record, provider fields left null");
            }
            let provider_sunshine = provider.and_then(|d| d.sunshine_duration_s).filter(|s| *s != 0.0);

            DailyAggregate {
                date_utc: day.to_string(),
                meta: meta.clone(),
                sunrise: provider.and_then(|d| d.sunrise.clone()),
                sunset: provider.and_then(|d| d.sunset.clone()),
                temp_day_max_c: provider.and_then(|d| d.temp_day_max_c),
                temp_day_min_c: provider.and_then(|d| d.temp_day_min_c),
                precip_day_total_mm: provider.and_then(|d| d.precip_day_total_mm),
                precip_probability_max_pct: provider.and_then(|d| d.precip_probability_max_pct),
                wind_day_max_ms: provider.and_then(|d| d.wind_day_max_ms),
                sunshine_duration_s: provider_sunshine.unwrap_or(fold.sunshine_s),
                ghi_daily_total_mj_m2: fold.ghi_mj_m2,
                cloud_cover_day_mean_pct: fold.cloud_sum / fold.hours.max(1) as f64,
                hours_count: fold.hours,
                pv: *pv,
            }
        })
        .collect()
}
