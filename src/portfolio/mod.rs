pub mod closing;
pub mod leg;
pub mod summary;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Digits kept when a model output crosses into money arithmetic.
const MODEL_OUTPUT_DP: u32 = 12;

/// Largest absolute price, strike or size accepted at the service boundary
/// (10^12). The product of two such values still fits a Decimal.
pub const MAX_MAGNITUDE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

#[inline]
pub fn in_bounds(d: Decimal) -> bool {
    d.abs() <= MAX_MAGNITUDE
}

/// Model output (f64) into money (Decimal). Non-finite or out-of-range
/// values become zero so nothing downstream sees NaN.
#[inline]
pub fn to_money(v: f64) -> Decimal {
    Decimal::from_f64(v)
        .map(|d| d.round_dp(MODEL_OUTPUT_DP))
        .unwrap_or(Decimal::ZERO)
}

/// Money into the pricer's floating-point domain.
#[inline]
pub fn to_model(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}
