//! Payoff and valuation engine for multi-leg option/future portfolios.
//!
//! Pure functions over leg snapshots: closed-form option pricing, payoff
//! curve sampling, and closing-PnL reconciliation. `server` wraps them in a
//! stateless JSON API.

pub mod config;
pub mod errors;
pub mod models;
pub mod payoff;
pub mod portfolio;
pub mod server;
pub mod state;

pub use models::black_scholes::{price, BlackScholes};
pub use payoff::curve::{build_curve, PayoffCurve};
pub use payoff::evaluator::{evaluate_at_price, EvalMode};
pub use payoff::PayoffPoint;
pub use portfolio::closing::resolve_closing_pnl;
pub use portfolio::leg::{Leg, LegKind, MarketContext, Quote};
pub use portfolio::summary::{summarize, PortfolioSummary};
