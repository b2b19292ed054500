use crate::models::{Greeks, ModelParams, OptionRight, PricingModel};
use chrono::{DateTime, Utc};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Black-Scholes European option pricing with zero rates and no dividends.
///
/// d1 = (ln(S/K) + sigma^2/2 * T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
/// call = S * Phi(d1) - K * Phi(d2)
/// put  = K * Phi(-d2) - S * Phi(-d1)
///
/// Expired or zero-vol inputs collapse to intrinsic value.
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }

    #[inline]
    fn d1_d2(params: &ModelParams) -> (f64, f64) {
        let d1 = (params.ln_s_k + params.half_sigma_sq * params.ttl_years) / params.sigma_sqrt_t;
        (d1, d1 - params.sigma_sqrt_t)
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingModel for BlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    fn fair_value(&self, params: &ModelParams, right: OptionRight) -> f64 {
        let intrinsic = right.intrinsic(params.spot, params.strike);
        if params.is_degenerate() {
            return intrinsic;
        }

        let (d1, d2) = Self::d1_d2(params);
        let value = match right {
            OptionRight::Call => {
                params.spot * self.normal.cdf(d1) - params.strike * self.normal.cdf(d2)
            }
            OptionRight::Put => {
                params.strike * self.normal.cdf(-d2) - params.spot * self.normal.cdf(-d1)
            }
        };

        if value.is_finite() {
            // Rounding in the CDF tails can dip a hair below zero
            value.max(0.0)
        } else {
            intrinsic
        }
    }

    fn greeks(&self, params: &ModelParams, right: OptionRight) -> Greeks {
        if params.is_degenerate() {
            let in_the_money = match right {
                OptionRight::Call => params.spot > params.strike,
                OptionRight::Put => params.spot < params.strike,
            };
            let delta = match (right, in_the_money) {
                (OptionRight::Call, true) => 1.0,
                (OptionRight::Put, true) => -1.0,
                _ => 0.0,
            };
            return Greeks { delta, ..Greeks::ZERO };
        }

        let (d1, _) = Self::d1_d2(params);
        let pdf = self.normal.pdf(d1);
        let delta = match right {
            OptionRight::Call => self.normal.cdf(d1),
            OptionRight::Put => self.normal.cdf(d1) - 1.0,
        };
        let gamma = pdf / (params.spot * params.sigma_sqrt_t);
        let vega = params.spot * pdf * params.sqrt_t / 100.0;
        // Zero rates: call and put theta coincide
        let theta = -(params.spot * pdf * params.sigma) / (2.0 * params.sqrt_t) / 365.0;

        let g = Greeks { delta, gamma, vega, theta };
        if g.delta.is_finite() && g.gamma.is_finite() && g.vega.is_finite() && g.theta.is_finite() {
            g
        } else {
            Greeks::ZERO
        }
    }
}

/// Theoretical price of one option unit from calendar inputs.
///
/// Volatility is a percentage. Never fails: non-positive spot, expired
/// options, and zero volatility all fall back to intrinsic value.
pub fn price(
    underlying: f64,
    strike: f64,
    iv_percent: f64,
    expiration: DateTime<Utc>,
    valuation: DateTime<Utc>,
    right: OptionRight,
) -> f64 {
    let params = ModelParams::from_dates(underlying, strike, iv_percent, expiration, valuation);
    BlackScholes::new().fair_value(&params, right)
}
