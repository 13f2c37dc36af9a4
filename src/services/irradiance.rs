//! Extraterrestrial and clear-sky horizontal irradiance.
//!
//! Both models are closed-form in the zenith angle and return exactly 0.0
//! with the sun at or below the horizon.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Utc};

/// Solar constant (W/m²)
pub const I_SC: f64 = 1367.0;

/// Guards divisions by cos(zenith) near the horizon.
pub const COS_ZENITH_EPS: f64 = 1e-6;

/// cos(zenith), floored to 0.0 for zenith angles at or past the horizon.
pub fn cos_zenith(zenith_deg: f64) -> f64 {
    if zenith_deg >= 90.0 {
        return 0.0;
    }
    zenith_deg.to_radians().cos().max(0.0)
}

/// Orbital eccentricity correction E0 for a day of year (1..=366).
pub fn eccentricity_correction(day_of_year: u32) -> f64 {
    1.0 + 0.033 * (2.0 * PI * day_of_year as f64 / 365.0).cos()
}

/// Extraterrestrial irradiance on a horizontal plane, GHI₀ = I_sc · E0 · cosZ,
/// with E0 taken from the UTC day of year of `when`.
pub fn extraterrestrial_horizontal(when: DateTime<Utc>, zenith_deg: f64) -> f64 {
    let cosz = cos_zenith(zenith_deg);
    if cosz <= 0.0 {
        return 0.0;
    }
    I_SC * eccentricity_correction(when.ordinal()) * cosz
}

/// Haurwitz clear-sky GHI = 1098 · cosZ · exp(-0.059 / cosZ).
///
/// Known simplification: no turbidity, water vapour or altitude terms.
pub fn clearsky_ghi_haurwitz(zenith_deg: f64) -> f64 {
    let cosz = cos_zenith(zenith_deg);
    if cosz <= 0.0 {
        return 0.0;
    }
    1098.0 * cosz * (-0.059 / cosz.max(COS_ZENITH_EPS)).exp()
}
