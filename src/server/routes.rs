use crate::errors::{EngineError, EngineResult};
use crate::models::volatility::normalize_iv_percent;
use crate::models::{Greeks, ModelParams, PricingModel};
use crate::payoff::curve::{build_curve_with, CurveExtrema, PayoffCurve};
use crate::payoff::evaluator::{evaluate_with, EvalMode};
use crate::portfolio::closing::resolve_closing_pnl;
use crate::portfolio::leg::{Leg, LegKind, MarketContext};
use crate::portfolio::summary::{summarize_with, PortfolioSummary};
use crate::portfolio::{in_bounds, to_model, to_money, MAX_MAGNITUDE};
use crate::state::{AppState, RequestCounters};
use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(serde::Deserialize)]
pub struct PriceRequest {
    pub kind: LegKind,
    pub underlying: Decimal,
    pub strike: Decimal,
    /// Percent or fraction
    pub implied_volatility: f64,
    pub expiration: DateTime<Utc>,
    pub valuation_date: Option<DateTime<Utc>>,
}

#[derive(serde::Serialize)]
pub struct PriceResponse {
    pub model: &'static str,
    pub price: Decimal,
    pub iv_percent: f64,
    pub greeks: Greeks,
}

#[derive(serde::Deserialize)]
pub struct EvaluateRequest {
    pub legs: Vec<Leg>,
    pub price: Decimal,
    pub mode: EvalMode,
    pub valuation_date: Option<DateTime<Utc>>,
}

#[derive(serde::Deserialize)]
pub struct CurveRequest {
    pub legs: Vec<Leg>,
    pub points: Option<usize>,
    pub valuation_date: Option<DateTime<Utc>>,
    pub x_min: Option<Decimal>,
    pub x_max: Option<Decimal>,
}

#[derive(serde::Serialize)]
pub struct CurveResponse {
    #[serde(flatten)]
    pub curve: PayoffCurve,
    pub break_evens: Vec<Decimal>,
    pub expiry_extrema: Option<CurveExtrema>,
    pub theoretical_extrema: Option<CurveExtrema>,
}

#[derive(serde::Deserialize)]
pub struct ClosingRequest {
    pub target: Leg,
    pub candidates: Vec<Leg>,
}

#[derive(serde::Deserialize)]
pub struct SummaryRequest {
    pub legs: Vec<Leg>,
    pub context: MarketContext,
}

fn reject(state: &AppState, msg: String) -> EngineError {
    RequestCounters::bump(&state.counters.requests_rejected);
    EngineError::InvalidRequest(msg)
}

fn check_value(state: &AppState, field: &str, value: Decimal) -> EngineResult<()> {
    if in_bounds(value) {
        Ok(())
    } else {
        Err(reject(state, format!("{field} {value} exceeds magnitude {MAX_MAGNITUDE}")))
    }
}

fn check_legs<'a>(state: &AppState, legs: impl IntoIterator<Item = &'a Leg>) -> EngineResult<()> {
    match legs.into_iter().find(|leg| !leg.is_in_bounds()) {
        Some(leg) => Err(reject(
            state,
            format!("leg {} has a value exceeding magnitude {MAX_MAGNITUDE}", leg.id),
        )),
        None => Ok(()),
    }
}

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /api/price -- theoretical price + greeks for one option unit
pub async fn price(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PriceRequest>,
) -> EngineResult<Json<PriceResponse>> {
    let Some(right) = req.kind.option_right() else {
        return Err(reject(&state, "futures have no option price".into()));
    };
    check_value(&state, "underlying", req.underlying)?;
    check_value(&state, "strike", req.strike)?;
    let iv_percent = normalize_iv_percent(req.implied_volatility);
    let params = ModelParams::from_dates(
        to_model(req.underlying),
        to_model(req.strike),
        iv_percent,
        req.expiration,
        req.valuation_date.unwrap_or_else(Utc::now),
    );

    RequestCounters::bump(&state.counters.prices_computed);
    Ok(Json(PriceResponse {
        model: state.model.name(),
        price: to_money(state.model.fair_value(&params, right)),
        iv_percent,
        greeks: state.model.greeks(&params, right),
    }))
}

/// POST /api/evaluate -- aggregate profit at one underlying price
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> EngineResult<Json<serde_json::Value>> {
    check_legs(&state, &req.legs)?;
    check_value(&state, "price", req.price)?;

    let valuation = req.valuation_date.unwrap_or_else(Utc::now);
    let profit = evaluate_with(&state.model, &req.legs, req.price, req.mode, valuation);

    RequestCounters::bump(&state.counters.evaluations);
    Ok(Json(serde_json::json!({ "profit": profit })))
}

/// POST /api/curve -- sampled payoff curve in both modes
pub async fn curve(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CurveRequest>,
) -> EngineResult<Json<CurveResponse>> {
    let points = req.points.unwrap_or(state.config.default_sample_points);
    if points > state.config.max_sample_points {
        return Err(reject(
            &state,
            format!("points {points} exceeds maximum {}", state.config.max_sample_points),
        ));
    }
    check_legs(&state, &req.legs)?;
    for (field, bound) in [("x_min", req.x_min), ("x_max", req.x_max)] {
        if let Some(v) = bound {
            check_value(&state, field, v)?;
        }
    }
    if let (Some(lo), Some(hi)) = (req.x_min, req.x_max) {
        if hi <= lo {
            return Err(reject(&state, format!("x_max {hi} must exceed x_min {lo}")));
        }
    }

    let valuation = req.valuation_date.unwrap_or_else(Utc::now);
    let curve = build_curve_with(&state.model, &req.legs, points, valuation, req.x_min, req.x_max);

    RequestCounters::bump(&state.counters.curves_built);
    state
        .counters
        .curve_points_sampled
        .fetch_add(curve.len() as u64, portable_atomic::Ordering::Relaxed);

    Ok(Json(CurveResponse {
        break_evens: curve.break_evens(EvalMode::Expiry),
        expiry_extrema: curve.extrema(EvalMode::Expiry),
        theoretical_extrema: curve.extrema(EvalMode::Theoretical),
        curve,
    }))
}

/// POST /api/closing-pnl -- null when the target closes nothing
pub async fn closing_pnl(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClosingRequest>,
) -> EngineResult<Json<serde_json::Value>> {
    check_legs(&state, std::iter::once(&req.target).chain(&req.candidates))?;
    let pnl = resolve_closing_pnl(&req.target, &req.candidates);

    RequestCounters::bump(&state.counters.closings_resolved);
    Ok(Json(serde_json::json!({ "closing_pnl": pnl })))
}

/// POST /api/summary -- per-leg figures and portfolio totals
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SummaryRequest>,
) -> EngineResult<Json<PortfolioSummary>> {
    check_legs(&state, &req.legs)?;
    check_value(&state, "underlying_price", req.context.underlying_price)?;
    let summary = summarize_with(&state.model, &req.legs, &req.context);

    RequestCounters::bump(&state.counters.summaries_built);
    Ok(Json(summary))
}

/// GET /api/counters -- request counters (lock-free reads)
pub async fn get_counters(
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    let c = &state.counters;
    Json(serde_json::json!({
        "prices_computed": c.prices_computed.load(Relaxed),
        "evaluations": c.evaluations.load(Relaxed),
        "curves_built": c.curves_built.load(Relaxed),
        "curve_points_sampled": c.curve_points_sampled.load(Relaxed),
        "closings_resolved": c.closings_resolved.load(Relaxed),
        "summaries_built": c.summaries_built.load(Relaxed),
        "requests_rejected": c.requests_rejected.load(Relaxed),
    }))
}
