/// Implied volatility arrives either as a percentage (75) or as a fraction
/// (0.75) depending on the source. Anything at or below this threshold is
/// read as a fraction.
pub const FRACTIONAL_IV_THRESHOLD: f64 = 3.0;

/// Normalize an implied volatility to percent.
///
/// Idempotent for values already above the threshold, so callers may apply it
/// at every boundary. Non-finite input becomes zero, which the pricer treats
/// as "no volatility" and answers with intrinsic value.
#[inline]
pub fn normalize_iv_percent(iv: f64) -> f64 {
    if !iv.is_finite() {
        return 0.0;
    }
    if iv <= FRACTIONAL_IV_THRESHOLD {
        iv * 100.0
    } else {
        iv
    }
}
