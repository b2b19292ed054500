use crate::portfolio::leg::Leg;
use crate::portfolio::{to_model, MAX_MAGNITUDE};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Fewest sample intervals a curve will ever use.
pub const MIN_SAMPLE_POINTS: usize = 20;

/// Range anchor for an empty portfolio
const DEFAULT_ANCHOR: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
const HALF: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
const ONE_AND_HALF: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Keeps the power of ten inside what Decimal can carry exactly.
const MAX_STEP_EXPONENT: i32 = 18;

/// Evenly spaced sample prices, `steps + 1` of them from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SampleGrid {
    pub start: Decimal,
    pub end: Decimal,
    /// Axis step the range was snapped to
    pub nice_step: Decimal,
    pub steps: usize,
}

impl SampleGrid {
    /// Spacing between consecutive samples after re-division.
    pub fn step(&self) -> Decimal {
        (self.end - self.start)
            .checked_div(Decimal::from(self.steps))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn len(&self) -> usize {
        self.steps + 1
    }

    /// Sample prices, ascending. First is exactly `start`, last exactly `end`.
    pub fn prices(&self) -> impl Iterator<Item = Decimal> + '_ {
        let span = self.end - self.start;
        let steps = Decimal::from(self.steps.max(1));
        let step = self.step();
        (0..=self.steps).map(move |i| {
            let i = Decimal::from(i);
            span.checked_mul(i)
                .and_then(|offset| offset.checked_div(steps))
                .or_else(|| step.checked_mul(i))
                .and_then(|offset| self.start.checked_add(offset))
                .map_or(self.end, |p| p.min(self.end))
        })
    }
}

/// Centre of the chart: mean of each included leg's strike (or entry price
/// when it has no positive strike).
pub fn anchor_price(legs: &[Leg]) -> Decimal {
    let (sum, count) = legs
        .iter()
        .filter(|leg| leg.is_included)
        .filter_map(|leg| match leg.strike {
            Some(strike) if strike > Decimal::ZERO => Some(strike),
            _ => leg.entry_price(),
        })
        .map(clamp_magnitude)
        .fold((Decimal::ZERO, 0u32), |(sum, n), v| match sum.checked_add(v) {
            Some(sum) => (sum, n + 1),
            None => (sum, n),
        });

    if count == 0 {
        DEFAULT_ANCHOR
    } else {
        sum / Decimal::from(count)
    }
}

/// Half to one-and-a-half times the anchor, never narrower than one unit.
pub fn default_range(anchor: Decimal) -> (Decimal, Decimal) {
    let anchor = clamp_magnitude(anchor);
    let start = anchor * HALF;
    let end = (anchor + Decimal::ONE).max(anchor * ONE_AND_HALF);
    (start, end)
}

/// Round `(end - start) / (points - 1)` to the nearest {1, 2, 5, 10} x 10^n.
pub fn nice_step(start: Decimal, end: Decimal, points: usize) -> Decimal {
    let intervals = points.max(2) - 1;
    let raw = to_model(end - start) / intervals as f64;
    if !raw.is_finite() || raw <= 0.0 {
        return Decimal::ONE;
    }

    let exponent = (raw.log10().floor() as i32).clamp(-MAX_STEP_EXPONENT, MAX_STEP_EXPONENT);
    let fraction = raw / 10f64.powi(exponent);
    let nice: i64 = if fraction < 1.5 {
        1
    } else if fraction < 3.0 {
        2
    } else if fraction < 7.0 {
        5
    } else {
        10
    };

    Decimal::from(nice) * pow10(exponent)
}

fn pow10(exponent: i32) -> Decimal {
    if exponent >= 0 {
        Decimal::from(10i64.pow(exponent as u32))
    } else {
        Decimal::new(1, exponent.unsigned_abs())
    }
}

/// Pull a chart bound back inside `MAX_MAGNITUDE` on either side.
fn clamp_magnitude(v: Decimal) -> Decimal {
    v.clamp(-MAX_MAGNITUDE, MAX_MAGNITUDE)
}

/// Choose the sampling grid for a portfolio.
///
/// Overrides replace the default range bound they name. Bounds are clamped
/// to `MAX_MAGNITUDE`. The range is snapped outward to the nice step, then
/// re-divided so the grid has between `MIN_SAMPLE_POINTS` and `points - 1`
/// intervals.
pub fn sample_grid(
    legs: &[Leg],
    points: usize,
    x_min: Option<Decimal>,
    x_max: Option<Decimal>,
) -> SampleGrid {
    let points = points.max(MIN_SAMPLE_POINTS);
    let (default_start, default_end) = default_range(anchor_price(legs));
    let start = clamp_magnitude(x_min.unwrap_or(default_start));
    let mut end = clamp_magnitude(x_max.unwrap_or(default_end));
    if end <= start {
        tracing::debug!(%start, %end, "empty chart range, widening");
        end = start + Decimal::ONE;
    }

    let nice = nice_step(start, end, points);
    let start = snap(start, nice, Decimal::floor);
    let end = snap(end, nice, Decimal::ceil);

    let needed = (end - start)
        .checked_div(nice)
        .and_then(|n| n.ceil().to_usize())
        .unwrap_or(points - 1);
    let steps = needed.min(points - 1).max(MIN_SAMPLE_POINTS);

    SampleGrid {
        start,
        end,
        nice_step: nice,
        steps,
    }
}

/// Round `v` to a multiple of `nice` with `round`. Values whose quotient
/// doesn't fit a Decimal stay where they are.
fn snap(v: Decimal, nice: Decimal, round: fn(&Decimal) -> Decimal) -> Decimal {
    v.checked_div(nice)
        .and_then(|q| round(&q).checked_mul(nice))
        .unwrap_or(v)
}
