use crate::models::black_scholes::BlackScholes;
use crate::models::PricingModel;
use crate::payoff::evaluator::{evaluate_with, EvalMode};
use crate::payoff::sampler::{sample_grid, SampleGrid};
use crate::payoff::PayoffPoint;
use crate::portfolio::leg::Leg;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Profit-vs-price series for charting. The three vectors are parallel and
/// ascending by price.
#[derive(Debug, Clone, Serialize)]
pub struct PayoffCurve {
    pub prices: Vec<Decimal>,
    pub expiry_profits: Vec<Decimal>,
    pub theoretical_profits: Vec<Decimal>,
    pub grid: SampleGrid,
}

/// Highest and lowest sampled profit for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurveExtrema {
    pub max_profit: PayoffPoint,
    pub max_loss: PayoffPoint,
}

/// Sample the portfolio across a price range in both modes.
pub fn build_curve(
    legs: &[Leg],
    sample_points: usize,
    valuation: DateTime<Utc>,
    x_min: Option<Decimal>,
    x_max: Option<Decimal>,
) -> PayoffCurve {
    build_curve_with(&BlackScholes::new(), legs, sample_points, valuation, x_min, x_max)
}

pub fn build_curve_with(
    model: &dyn PricingModel,
    legs: &[Leg],
    sample_points: usize,
    valuation: DateTime<Utc>,
    x_min: Option<Decimal>,
    x_max: Option<Decimal>,
) -> PayoffCurve {
    let grid = sample_grid(legs, sample_points, x_min, x_max);

    let mut prices = Vec::with_capacity(grid.len());
    let mut expiry_profits = Vec::with_capacity(grid.len());
    let mut theoretical_profits = Vec::with_capacity(grid.len());

    for price in grid.prices() {
        prices.push(price);
        expiry_profits.push(evaluate_with(model, legs, price, EvalMode::Expiry, valuation));
        theoretical_profits.push(evaluate_with(model, legs, price, EvalMode::Theoretical, valuation));
    }

    tracing::debug!(
        model = model.name(),
        legs = legs.len(),
        points = prices.len(),
        start = %grid.start,
        end = %grid.end,
        step = %grid.nice_step,
        "payoff curve built"
    );

    PayoffCurve {
        prices,
        expiry_profits,
        theoretical_profits,
        grid,
    }
}

impl PayoffCurve {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn profits(&self, mode: EvalMode) -> &[Decimal] {
        match mode {
            EvalMode::Expiry => &self.expiry_profits,
            EvalMode::Theoretical => &self.theoretical_profits,
        }
    }

    pub fn points(&self, mode: EvalMode) -> Vec<PayoffPoint> {
        self.prices
            .iter()
            .zip(self.profits(mode))
            .map(|(&price, &profit)| PayoffPoint { price, profit })
            .collect()
    }

    /// Prices where profit crosses zero, linearly interpolated between samples.
    /// Samples sitting exactly on zero are reported once, flat zero stretches
    /// only at their edges. A curve that is zero everywhere has none.
    pub fn break_evens(&self, mode: EvalMode) -> Vec<Decimal> {
        let profits = self.profits(mode);
        let mut out: Vec<Decimal> = Vec::new();
        if profits.iter().all(|p| p.is_zero()) {
            return out;
        }

        for i in 0..profits.len() {
            let (p0, v0) = (self.prices[i], profits[i]);
            if v0.is_zero() {
                let prev_zero = i > 0 && profits[i - 1].is_zero();
                let next_zero = profits.get(i + 1).is_some_and(|v| v.is_zero());
                if !(prev_zero && next_zero) {
                    out.push(p0);
                }
                continue;
            }
            let Some(&v1) = profits.get(i + 1) else {
                continue;
            };
            if !v1.is_zero() && v0.is_sign_negative() != v1.is_sign_negative() {
                let p1 = self.prices[i + 1];
                let crossing = (p1 - p0)
                    .checked_mul(-v0)
                    .zip(v1.checked_sub(v0))
                    .and_then(|(num, den)| num.checked_div(den))
                    .and_then(|offset| p0.checked_add(offset));
                // Fall back to the midpoint when the interpolation overflows
                out.push(crossing.unwrap_or_else(|| p0 + (p1 - p0) / Decimal::TWO));
            }
        }
        out
    }

    pub fn extrema(&self, mode: EvalMode) -> Option<CurveExtrema> {
        let points = self.points(mode);
        let max_profit = *points.iter().max_by(|a, b| a.profit.cmp(&b.profit))?;
        let max_loss = *points.iter().min_by(|a, b| a.profit.cmp(&b.profit))?;
        Some(CurveExtrema { max_profit, max_loss })
    }
}
