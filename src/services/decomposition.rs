//! Erbs decomposition of GHI into direct-normal and diffuse-horizontal parts.
//!
//! Only used when the provider does not supply both DNI and DHI.

use crate::services::irradiance::{cos_zenith, COS_ZENITH_EPS};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposition {
    pub dni_w_m2: f64,
    pub dhi_w_m2: f64,
}

/// Diffuse fraction as a function of clearness index kt (Erbs et al. 1982).
pub fn erbs_diffuse_fraction(kt: f64) -> f64 {
    let df = if kt <= 0.22 {
        1.0 - 0.09 * kt
    } else if kt <= 0.8 {
        0.9511 - 0.1604 * kt + 4.388 * kt.powi(2) - 16.638 * kt.powi(3) + 12.336 * kt.powi(4)
    } else {
        0.165
    };
    df.clamp(0.0, 1.0)
}

pub fn erbs_decomposition(ghi: f64, ghi0: f64, zenith_deg: f64) -> Decomposition {
    let cosz = cos_zenith(zenith_deg);
    if ghi <= 0.0 || ghi0 <= 0.0 || cosz <= 0.0 {
        // Nothing to split: whatever is left is diffuse
        return Decomposition { dni_w_m2: 0.0, dhi_w_m2: ghi.max(0.0) };
    }

    let kt = (ghi / ghi0).min(2.0);
    let dhi = erbs_diffuse_fraction(kt) * ghi;
    let dni = ((ghi - dhi) / cosz.max(COS_ZENITH_EPS)).max(0.0);
    Decomposition { dni_w_m2: dni, dhi_w_m2: dhi }
}

/// Provider components win when both are present; otherwise fall back to Erbs.
pub fn decompose_or_pass_through(
    provider_dni: Option<f64>,
    provider_dhi: Option<f64>,
    ghi: f64,
    ghi0: f64,
    zenith_deg: f64,
) -> Decomposition {
    match (provider_dni, provider_dhi) {
        (Some(dni), Some(dhi)) => Decomposition { dni_w_m2: dni, dhi_w_m2: dhi },
        _ => erbs_decomposition(ghi, ghi0, zenith_deg),
    }
}
