//! Per-leg and portfolio-level figures for one market snapshot.
//! All functions are pure -- they take legs and a context and return values.

use crate::models::black_scholes::BlackScholes;
use crate::models::{Greeks, ModelParams, PricingModel};
use crate::portfolio::closing::resolve_closing_pnl;
use crate::portfolio::leg::{Leg, LegKind, MarketContext};
use crate::portfolio::{to_model, to_money};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, serde::Serialize)]
pub struct LegSummary {
    pub id: Uuid,
    pub kind: LegKind,
    pub is_included: bool,
    pub entry_price: Option<Decimal>,
    /// Model value per unit at the context's underlying price
    pub theoretical_price: Option<Decimal>,
    /// Mark-to-market PnL; marks from the quote win over the model
    pub pnl: Option<Decimal>,
    pub closing_pnl: Option<Decimal>,
    /// Size-scaled
    pub greeks: Greeks,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PortfolioSummary {
    pub underlying_price: Decimal,
    pub valuation_date: DateTime<Utc>,
    pub legs: Vec<LegSummary>,
    pub included_legs: usize,
    /// Sum of resolvable PnL over included legs; rows whose PnL would leave
    /// Decimal's range carry none
    pub total_pnl: Decimal,
    pub greeks: Greeks,
}

pub fn summarize(legs: &[Leg], ctx: &MarketContext) -> PortfolioSummary {
    summarize_with(&BlackScholes::new(), legs, ctx)
}

pub fn summarize_with(model: &dyn PricingModel, legs: &[Leg], ctx: &MarketContext) -> PortfolioSummary {
    let rows: Vec<LegSummary> = legs.iter().map(|leg| summarize_leg(model, leg, legs, ctx)).collect();

    let included = rows.iter().filter(|r| r.is_included);
    let (total_pnl, greeks, included_legs) = included.fold(
        (Decimal::ZERO, Greeks::ZERO, 0usize),
        |(pnl, greeks, n), r| {
            let pnl = r.pnl.and_then(|p| pnl.checked_add(p)).unwrap_or(pnl);
            (pnl, greeks.add(&r.greeks), n + 1)
        },
    );

    PortfolioSummary {
        underlying_price: ctx.underlying_price,
        valuation_date: ctx.valuation_date,
        legs: rows,
        included_legs,
        total_pnl,
        greeks,
    }
}

fn summarize_leg(model: &dyn PricingModel, leg: &Leg, siblings: &[Leg], ctx: &MarketContext) -> LegSummary {
    let entry_price = leg.entry_price();
    let theoretical_price = theoretical_price(model, leg, ctx);
    let pnl = match (leg.mark().or(theoretical_price), entry_price) {
        (Some(value), Some(entry)) => value.checked_sub(entry).and_then(|d| d.checked_mul(leg.size)),
        _ => None,
    };

    LegSummary {
        id: leg.id,
        kind: leg.kind,
        is_included: leg.is_included,
        entry_price,
        theoretical_price,
        pnl,
        closing_pnl: resolve_closing_pnl(leg, siblings),
        greeks: leg_greeks(model, leg, ctx),
    }
}

/// Per-unit model value at the context's underlying. Futures track the
/// underlying one-for-one; options missing strike or expiry have none.
pub fn theoretical_price(model: &dyn PricingModel, leg: &Leg, ctx: &MarketContext) -> Option<Decimal> {
    if leg.kind == LegKind::Future {
        return Some(ctx.underlying_price);
    }
    let (right, strike, expiration) = leg.option_terms()?;
    let params = ModelParams::from_dates(
        to_model(ctx.underlying_price),
        to_model(strike),
        leg.iv_percent(),
        expiration,
        ctx.valuation_date,
    );
    Some(to_money(model.fair_value(&params, right)))
}

pub fn leg_greeks(model: &dyn PricingModel, leg: &Leg, ctx: &MarketContext) -> Greeks {
    let size = to_model(leg.size);
    if leg.kind == LegKind::Future {
        return Greeks { delta: size, ..Greeks::ZERO };
    }
    let Some((right, strike, expiration)) = leg.option_terms() else {
        return Greeks::ZERO;
    };
    let params = ModelParams::from_dates(
        to_model(ctx.underlying_price),
        to_model(strike),
        leg.iv_percent(),
        expiration,
        ctx.valuation_date,
    );
    model.greeks(&params, right).scale(size)
}
