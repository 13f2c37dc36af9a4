/// ============================================================
///  Solar position (NOAA / Meeus low-precision series)
///
///   1. Julian century from the UTC instant
///   2. Sun's apparent longitude, obliquity → declination
///   3. Equation of time → true solar time → hour angle
///   4. Zenith / elevation / azimuth for the observer
///   5. NOAA atmospheric refraction correction on elevation
///
///  Accuracy is ~0.01° for 1800-2100, valid at every latitude
///  including the poles (azimuth uses atan2, no division by cos φ).
/// ============================================================

use chrono::{DateTime, Utc};

use crate::models::features::{GeoPoint, SolarGeometry};

const JD_UNIX_EPOCH: f64 = 2_440_587.5;
const JD_J2000: f64 = 2_451_545.0;

pub fn solar_geometry(point: &GeoPoint, when: DateTime<Utc>) -> SolarGeometry {
    // ── 1. Time ────────────────────────────────────────────────
    let unix_s = when.timestamp() as f64 + when.timestamp_subsec_nanos() as f64 / 1e9;
    let jd = unix_s / 86_400.0 + JD_UNIX_EPOCH;
    let jc = (jd - JD_J2000) / 36_525.0;
    let minutes_of_day = unix_s.rem_euclid(86_400.0) / 60.0;

    // ── 2. Sun's coordinates ───────────────────────────────────
    let mean_long = (280.46646 + jc * (36_000.76983 + jc * 0.0003032)).rem_euclid(360.0);
    let mean_anom = 357.52911 + jc * (35_999.05029 - 0.0001537 * jc);
    let ecc = 0.016708634 - jc * (0.000042037 + 0.0000001267 * jc);
    let m = mean_anom.to_radians();
    let eq_center = m.sin() * (1.914602 - jc * (0.004817 + 0.000014 * jc))
        + (2.0 * m).sin() * (0.019993 - 0.000101 * jc)
        + (3.0 * m).sin() * 0.000289;
    let omega = (125.04 - 1934.136 * jc).to_radians();
    let app_long = mean_long + eq_center - 0.00569 - 0.00478 * omega.sin();

    let mean_obliq = 23.0 + (26.0 + (21.448 - jc * (46.815 + jc * (0.00059 - jc * 0.001813))) / 60.0) / 60.0;
    let obliq = (mean_obliq + 0.00256 * omega.cos()).to_radians();
    let decl = (obliq.sin() * app_long.to_radians().sin()).asin();

    // ── 3. Equation of time & hour angle ───────────────────────
    let y = (obliq / 2.0).tan().powi(2);
    let l0 = mean_long.to_radians();
    let eot_min = 4.0
        * (y * (2.0 * l0).sin() - 2.0 * ecc * m.sin() + 4.0 * ecc * y * m.sin() * (2.0 * l0).cos()
            - 0.5 * y * y * (4.0 * l0).sin()
            - 1.25 * ecc * ecc * (2.0 * m).sin())
        .to_degrees();
    let true_solar_min = (minutes_of_day + eot_min + 4.0 * point.longitude()).rem_euclid(1440.0);
    let hour_angle = (true_solar_min / 4.0 - 180.0).to_radians();

    // ── 4. Observer geometry ───────────────────────────────────
    let lat = point.latitude().to_radians();
    let cos_zen = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * hour_angle.cos()).clamp(-1.0, 1.0);
    let geometric_elev = 90.0 - cos_zen.acos().to_degrees();

    let azimuth_deg = (hour_angle
        .sin()
        .atan2(hour_angle.cos() * lat.sin() - decl.tan() * lat.cos())
        .to_degrees()
        + 180.0)
        .rem_euclid(360.0);

    // ── 5. Refraction ──────────────────────────────────────────
    let elevation_deg = geometric_elev + refraction_deg(geometric_elev);

    SolarGeometry {
        elevation_deg,
        azimuth_deg,
        zenith_deg: (90.0 - elevation_deg).max(0.0),
    }
}

/// NOAA approximation of atmospheric refraction (degrees) at a geometric elevation.
fn refraction_deg(elev_deg: f64) -> f64 {
    if elev_deg > 85.0 {
        return 0.0;
    }
    let te = elev_deg.to_radians().tan();
    let arcsec = if elev_deg > 5.0 {
        58.1 / te - 0.07 / te.powi(3) + 0.000086 / te.powi(5)
    } else if elev_deg > -0.575 {
        1735.0 + elev_deg * (-518.2 + elev_deg * (103.4 + elev_deg * (-12.79 + elev_deg * 0.711)))
    } else {
        -20.772 / te
    };
    arcsec / 3600.0
}
