/// Default GHI threshold (W/m²) above which an hour counts as sunny.
pub const SUNSHINE_THRESHOLD_W_M2: f64 = 120.0;

/// Coarse per-hour sunshine duration: the whole hour (3600 s) when GHI reaches
/// the threshold, nothing otherwise. No sub-hour integration is attempted.
pub fn sunshine_duration_hour_from_ghi(ghi_w_m2: Option<f64>, threshold: f64) -> f64 {
    if ghi_w_m2.unwrap_or(0.0) >= threshold { 3600.0 } else { 0.0 }
}
