//! Raw-count to physical-unit conversion
//!
//! The sensor rig reports volume as raw integrator counts. A fixed
//! calibration multiplier scales them to milliliters.

/// Calibration multiplier from raw volume counts to milliliters.
pub const VOLUME_SCALER: f64 = 0.0018;

/// Convert raw volume counts to milliliters using the given scaler.
///
/// Pure linear function with no failure mode; `to_milliliters(0.0, s) == 0.0`
/// for any scaler.
pub fn to_milliliters(raw: f64, scaler: f64) -> f64 {
    raw * scaler
}
