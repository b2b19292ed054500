pub mod curve;
pub mod evaluator;
pub mod sampler;

use rust_decimal::Decimal;

/// One chart sample. Curves are ordered ascending by price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PayoffPoint {
    pub price: Decimal,
    pub profit: Decimal,
}
