//! Leg records and the market context they are valued against.
//!
//! Optional fields stay `Option` all the way through: a missing strike or
//! entry price takes a different code path than a zero one.

use crate::models::volatility::normalize_iv_percent;
use crate::models::OptionRight;
use crate::portfolio::in_bounds;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegKind {
    Call,
    Put,
    Future,
}

impl LegKind {
    #[inline]
    pub fn option_right(self) -> Option<OptionRight> {
        match self {
            LegKind::Call => Some(OptionRight::Call),
            LegKind::Put => Some(OptionRight::Put),
            LegKind::Future => None,
        }
    }
}

impl std::fmt::Display for LegKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
            Self::Future => write!(f, "future"),
        }
    }
}

/// Top-of-book snapshot for a leg's instrument. Source of the placeholder
/// entry price while the leg is unfilled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub best_bid: Option<Decimal>,
    #[serde(default)]
    pub best_ask: Option<Decimal>,
    #[serde(default)]
    pub mark: Option<Decimal>,
}

impl Quote {
    /// Price an unfilled leg would trade at: buyers lift the ask, sellers hit
    /// the bid, mark is the fallback either way.
    pub fn placeholder(&self, size: Decimal) -> Option<Decimal> {
        if size >= Decimal::ZERO {
            self.best_ask.or(self.mark).or(self.best_bid)
        } else {
            self.best_bid.or(self.mark).or(self.best_ask)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub kind: LegKind,
    #[serde(default)]
    pub strike: Option<Decimal>,
    /// Absent for perpetual futures
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
    /// Positive = long, negative = short
    pub size: Decimal,
    /// Fill price; absent while unfilled
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Percent (75 = 75%); fractions are accepted and normalized on read
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub quote: Option<Quote>,
    #[serde(default = "default_included")]
    pub is_included: bool,
}

fn default_included() -> bool {
    true
}

impl Leg {
    pub fn new(kind: LegKind, size: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            strike: None,
            expiration: None,
            size,
            price: None,
            implied_volatility: None,
            quote: None,
            is_included: true,
        }
    }

    pub fn option(kind: LegKind, strike: Decimal, expiration: DateTime<Utc>, size: Decimal) -> Self {
        Self {
            strike: Some(strike),
            expiration: Some(expiration),
            ..Self::new(kind, size)
        }
    }

    pub fn future(size: Decimal, price: Decimal) -> Self {
        Self::new(LegKind::Future, size).with_price(price)
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_iv(mut self, iv: f64) -> Self {
        self.implied_volatility = Some(iv);
        self
    }

    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quote = Some(quote);
        self
    }

    pub fn excluded(mut self) -> Self {
        self.is_included = false;
        self
    }

    /// Fill price, else the quote placeholder for this leg's direction.
    pub fn entry_price(&self) -> Option<Decimal> {
        self.price
            .or_else(|| self.quote.as_ref().and_then(|q| q.placeholder(self.size)))
    }

    /// Implied volatility in percent; missing reads as zero.
    #[inline]
    pub fn iv_percent(&self) -> f64 {
        self.implied_volatility.map(normalize_iv_percent).unwrap_or(0.0)
    }

    /// Right, strike, and expiry for a priceable option leg. None for futures
    /// and for options missing either strike or expiry.
    pub fn option_terms(&self) -> Option<(OptionRight, Decimal, DateTime<Utc>)> {
        let right = self.kind.option_right()?;
        Some((right, self.strike?, self.expiration?))
    }

    #[inline]
    pub fn mark(&self) -> Option<Decimal> {
        self.quote.as_ref().and_then(|q| q.mark)
    }

    /// Every money and size field within `MAX_MAGNITUDE`.
    pub fn is_in_bounds(&self) -> bool {
        let quote = self.quote.unwrap_or_default();
        [self.strike, Some(self.size), self.price, quote.best_bid, quote.best_ask, quote.mark]
            .into_iter()
            .flatten()
            .all(in_bounds)
    }
}

/// Inputs shared by every leg in one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub underlying_price: Decimal,
    pub valuation_date: DateTime<Utc>,
}
