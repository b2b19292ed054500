pub mod black_scholes;
pub mod volatility;

use chrono::{DateTime, Utc};

/// Floor applied to spot and strike before any log/division.
pub const PRICE_EPSILON: f64 = 1e-6;

const DAYS_PER_YEAR: f64 = 365.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Call/put flag for the option pricer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    #[inline]
    pub fn is_call(self) -> bool {
        matches!(self, OptionRight::Call)
    }

    /// Payoff if exercised at `spot`.
    #[inline]
    pub fn intrinsic(self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionRight::Call => (spot - strike).max(0.0),
            OptionRight::Put => (strike - spot).max(0.0),
        }
    }
}

/// All pricing models implement this trait.
/// Both methods must be pure: deterministic output from inputs only,
/// always finite. Send + Sync so one instance can serve concurrent requests.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fair value of one option unit.
    fn fair_value(&self, params: &ModelParams, right: OptionRight) -> f64;

    /// Per-unit sensitivities.
    fn greeks(&self, params: &ModelParams, right: OptionRight) -> Greeks;
}

// ── Precomputed model parameters (stack, no alloc) ──

#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ModelParams {
    pub spot: f64,
    pub strike: f64,
    pub ttl_years: f64,
    pub sigma: f64,
    // Precomputed
    pub ln_s_k: f64,
    pub sqrt_t: f64,
    pub sigma_sqrt_t: f64,
    pub half_sigma_sq: f64,
}

impl ModelParams {
    /// Spot and strike are floored at `PRICE_EPSILON`, negative time and
    /// volatility at zero. A non-positive spot also zeroes time, leaving only
    /// intrinsic value.
    #[inline]
    pub fn new(spot: f64, strike: f64, ttl_years: f64, sigma: f64) -> Self {
        let spot = finite_or(spot, 0.0);
        let ttl_years = if spot > 0.0 {
            finite_or(ttl_years, 0.0).max(0.0)
        } else {
            0.0
        };
        let spot = spot.max(PRICE_EPSILON);
        let strike = finite_or(strike, 0.0).max(PRICE_EPSILON);
        let sigma = finite_or(sigma, 0.0).max(0.0);

        let ln_s_k = (spot / strike).ln();
        let sqrt_t = ttl_years.sqrt();
        let sigma_sqrt_t = sigma * sqrt_t;
        let half_sigma_sq = 0.5 * sigma * sigma;
        Self {
            spot,
            strike,
            ttl_years,
            sigma,
            ln_s_k,
            sqrt_t,
            sigma_sqrt_t,
            half_sigma_sq,
        }
    }

    /// Build from calendar inputs. Volatility is a percentage (75 = 75%).
    pub fn from_dates(
        spot: f64,
        strike: f64,
        iv_percent: f64,
        expiration: DateTime<Utc>,
        valuation: DateTime<Utc>,
    ) -> Self {
        Self::new(
            spot,
            strike,
            years_between(valuation, expiration),
            iv_percent / 100.0,
        )
    }

    /// Expiry reached or no volatility: only intrinsic value is meaningful.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.ttl_years <= 0.0 || self.sigma <= 0.0 || self.sigma_sqrt_t < 1e-12
    }
}

/// Year fraction from `from` to `to` on a 365-day calendar, clamped at zero.
pub fn years_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let days = (to - from).num_milliseconds() as f64 / MILLIS_PER_DAY;
    (days / DAYS_PER_YEAR).max(0.0)
}

#[inline]
fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

/// Option sensitivities. Vega is per volatility point, theta per calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
}

impl Greeks {
    pub const ZERO: Greeks = Greeks {
        delta: 0.0,
        gamma: 0.0,
        vega: 0.0,
        theta: 0.0,
    };

    /// Scale by position size
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            vega: self.vega * factor,
            theta: self.theta * factor,
        }
    }

    pub fn add(&self, other: &Greeks) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            vega: self.vega + other.vega,
            theta: self.theta + other.theta,
        }
    }
}
