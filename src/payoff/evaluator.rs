use crate::models::black_scholes::BlackScholes;
use crate::models::{ModelParams, OptionRight, PricingModel};
use crate::portfolio::leg::{Leg, LegKind};
use crate::portfolio::{to_model, to_money};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which profit a leg is marked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    /// Intrinsic payoff at expiry
    Expiry,
    /// Model value at the valuation date
    Theoretical,
}

/// Aggregate profit of the included legs if the underlying sat at `price`.
pub fn evaluate_at_price(
    legs: &[Leg],
    price: Decimal,
    mode: EvalMode,
    valuation: DateTime<Utc>,
) -> Decimal {
    evaluate_with(&BlackScholes::new(), legs, price, mode, valuation)
}

/// Same as [`evaluate_at_price`] with an explicit pricing model.
pub fn evaluate_with(
    model: &dyn PricingModel,
    legs: &[Leg],
    price: Decimal,
    mode: EvalMode,
    valuation: DateTime<Utc>,
) -> Decimal {
    legs.iter()
        .filter(|leg| leg.is_included)
        .map(|leg| leg_profit(model, leg, price, mode, valuation))
        .fold(Decimal::ZERO, |total, profit| match total.checked_add(profit) {
            Some(sum) => sum,
            None => {
                tracing::debug!(%total, %profit, "profit sum overflow, leg dropped");
                total
            }
        })
}

/// One leg's profit at `price`. Legs that can't be valued (option without
/// strike/expiry, no resolvable entry price, a profit outside Decimal's
/// range) contribute zero.
pub fn leg_profit(
    model: &dyn PricingModel,
    leg: &Leg,
    price: Decimal,
    mode: EvalMode,
    valuation: DateTime<Utc>,
) -> Decimal {
    let Some(entry) = leg.entry_price() else {
        return Decimal::ZERO;
    };
    leg_value(model, leg, price, mode, valuation)
        .and_then(|value| value.checked_sub(entry))
        .and_then(|diff| diff.checked_mul(leg.size))
        .unwrap_or(Decimal::ZERO)
}

/// Per-unit value of a leg with the underlying at `price`.
pub fn leg_value(
    model: &dyn PricingModel,
    leg: &Leg,
    price: Decimal,
    mode: EvalMode,
    valuation: DateTime<Utc>,
) -> Option<Decimal> {
    if leg.kind == LegKind::Future {
        // No time value: both modes are linear in the underlying
        return Some(price);
    }

    let (right, strike, expiration) = leg.option_terms()?;
    let value = match mode {
        EvalMode::Expiry => match right {
            OptionRight::Call => price.checked_sub(strike)?.max(Decimal::ZERO),
            OptionRight::Put => strike.checked_sub(price)?.max(Decimal::ZERO),
        },
        EvalMode::Theoretical => {
            let params = ModelParams::from_dates(
                to_model(price),
                to_model(strike),
                leg.iv_percent(),
                expiration,
                valuation,
            );
            to_money(model.fair_value(&params, right))
        }
    };
    Some(value)
}
