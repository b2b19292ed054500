//! Closing-PnL reconciliation.
//!
//! A leg opened against existing same-kind, same-strike, same-expiry legs of
//! the opposite direction closes the overlapping quantity. The realized PnL of
//! that overlap is measured against the size-weighted average entry of the
//! existing side.
//!
//! Existing legs whose entry price can't be resolved are left out of the
//! average, which can understate the cost basis. Known approximation.

use crate::portfolio::leg::{Leg, LegKind};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use smallvec::SmallVec;

/// Strikes closer than this are the same strike
pub const STRIKE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Net or closing sizes below this are no position at all
pub const SIZE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Same kind, strike within tolerance, expiry on the same calendar day.
/// Missing strike or expiry only matches another missing one. Futures have
/// no strike, so theirs is never compared.
pub fn is_matching(a: &Leg, b: &Leg) -> bool {
    if a.kind != b.kind {
        return false;
    }
    let strikes_match = a.kind == LegKind::Future
        || match (a.strike, b.strike) {
            (Some(x), Some(y)) => x.checked_sub(y).is_some_and(|d| d.abs() < STRIKE_TOLERANCE),
            (None, None) => true,
            _ => false,
        };
    let expiries_match = match (a.expiration, b.expiration) {
        (Some(x), Some(y)) => x.date_naive() == y.date_naive(),
        (None, None) => true,
        _ => false,
    };
    strikes_match && expiries_match
}

/// PnL realized by `target` closing against matching `candidates`.
///
/// None when nothing offsets the target: no matches, matches netting flat,
/// matches on the same side as the target, or no resolvable prices. A
/// returned zero is a genuine break-even close.
pub fn resolve_closing_pnl(target: &Leg, candidates: &[Leg]) -> Option<Decimal> {
    let matches: SmallVec<[&Leg; 8]> = candidates
        .iter()
        .filter(|c| c.id != target.id && is_matching(target, c))
        .collect();

    let net_size = matches
        .iter()
        .try_fold(Decimal::ZERO, |net, c| net.checked_add(c.size))?;
    if net_size.abs() < SIZE_EPSILON || net_size.signum() == target.size.signum() {
        return None;
    }

    let closing_size = target.size.abs().min(net_size.abs());
    if closing_size < SIZE_EPSILON {
        return None;
    }

    let existing_entry = weighted_entry_price(
        matches
            .iter()
            .copied()
            .filter(|c| c.size.signum() == net_size.signum()),
    )?;
    let target_entry = target.entry_price()?;

    let pnl = target_entry
        .checked_sub(existing_entry)?
        .checked_mul(closing_size)?
        * net_size.signum();
    tracing::trace!(
        target = %target.id,
        matched = matches.len(),
        %net_size,
        %closing_size,
        %existing_entry,
        %pnl,
        "closing pnl resolved"
    );
    Some(pnl)
}

/// Size-weighted mean entry price, skipping legs without one. None when
/// nothing is priced or the notional leaves Decimal's range.
pub fn weighted_entry_price<'a>(mut legs: impl Iterator<Item = &'a Leg>) -> Option<Decimal> {
    let (notional, weight) = legs
        .try_fold((Decimal::ZERO, Decimal::ZERO), |(n, w), leg| match leg.entry_price() {
            Some(p) => {
                let size = leg.size.abs();
                Some((n.checked_add(p.checked_mul(size)?)?, w.checked_add(size)?))
            }
            None => Some((n, w)),
        })?;

    if weight < SIZE_EPSILON {
        None
    } else {
        notional.checked_div(weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::leg::LegKind;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn expiry() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 28, 8, 0, 0).unwrap()
    }

    fn call(size: Decimal, price: Decimal) -> Leg {
        Leg::option(LegKind::Call, dec!(100), expiry(), size).with_price(price)
    }

    #[test]
    fn test_partial_close_against_weighted_average() {
        let a = call(dec!(2), dec!(5));
        let b = call(dec!(2), dec!(3));
        let c = call(dec!(-1), dec!(7));
        // avg entry (5*2 + 3*2) / 4 = 4, closes 1 contract at 7
        assert_eq!(resolve_closing_pnl(&c, &[a, b]), Some(dec!(3)));
    }

    #[test]
    fn test_order_does_not_matter() {
        let a = call(dec!(2), dec!(5));
        let b = call(dec!(1), dec!(2));
        let c = call(dec!(-3), dec!(6));
        let forward = resolve_closing_pnl(&c, &[a.clone(), b.clone()]);
        let backward = resolve_closing_pnl(&c, &[b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward, Some(dec!(6)));
    }

    #[test]
    fn test_short_side_existing() {
        // Existing short 3 @ 10, buying back 2 @ 6: short side earns 4 each
        let existing = call(dec!(-3), dec!(10));
        let buy_back = call(dec!(2), dec!(6));
        assert_eq!(resolve_closing_pnl(&buy_back, &[existing]), Some(dec!(8)));
    }

    #[test]
    fn test_closing_size_capped_by_existing() {
        let existing = call(dec!(1), dec!(4));
        let big_sell = call(dec!(-5), dec!(6));
        assert_eq!(resolve_closing_pnl(&big_sell, &[existing]), Some(dec!(2)));
    }

    #[test]
    fn test_same_direction_is_none() {
        let a = call(dec!(2), dec!(5));
        let more = call(dec!(1), dec!(7));
        assert_eq!(resolve_closing_pnl(&more, &[a]), None);
    }

    #[test]
    fn test_flat_net_is_none() {
        let a = call(dec!(2), dec!(5));
        let b = call(dec!(-2), dec!(6));
        let c = call(dec!(-1), dec!(7));
        assert_eq!(resolve_closing_pnl(&c, &[a, b]), None);
    }

    #[test]
    fn test_target_excluded_from_candidates() {
        let a = call(dec!(2), dec!(5));
        let c = call(dec!(-1), dec!(7));
        let with_self = resolve_closing_pnl(&c, &[a.clone(), c.clone()]);
        assert_eq!(with_self, resolve_closing_pnl(&c, &[a]));
        assert_eq!(with_self, Some(dec!(2)));
    }

    #[test]
    fn test_mismatches_ignored() {
        let c = call(dec!(-1), dec!(7));
        let other_strike = Leg::option(LegKind::Call, dec!(105), expiry(), dec!(2)).with_price(dec!(5));
        let other_kind = Leg::option(LegKind::Put, dec!(100), expiry(), dec!(2)).with_price(dec!(5));
        let other_day = Leg::option(LegKind::Call, dec!(100), expiry() + Duration::days(1), dec!(2))
            .with_price(dec!(5));
        assert_eq!(resolve_closing_pnl(&c, &[other_strike, other_kind, other_day]), None);
    }

    #[test]
    fn test_match_tolerances() {
        let a = call(dec!(1), dec!(5));
        let mut near = call(dec!(1), dec!(5));
        near.strike = Some(dec!(100.005));
        near.expiration = Some(expiry() + Duration::hours(4));
        assert!(is_matching(&a, &near));

        let perp_a = Leg::future(dec!(1), dec!(100));
        let perp_b = Leg::future(dec!(-1), dec!(101));
        assert!(is_matching(&perp_a, &perp_b));

        let mut dated = perp_b.clone();
        dated.expiration = Some(expiry());
        assert!(!is_matching(&perp_a, &dated));
    }

    #[test]
    fn test_unpriced_existing_legs_skipped() {
        let priced = call(dec!(1), dec!(4));
        let unpriced = Leg::option(LegKind::Call, dec!(100), expiry(), dec!(3));
        let c = call(dec!(-2), dec!(6));
        // Net +4, closes 2 against avg 4 from the priced leg only
        assert_eq!(resolve_closing_pnl(&c, &[priced, unpriced.clone()]), Some(dec!(4)));
        assert_eq!(resolve_closing_pnl(&c, &[unpriced]), None);
    }

    #[test]
    fn test_unpriced_target_is_none() {
        let a = call(dec!(2), dec!(5));
        let c = Leg::option(LegKind::Call, dec!(100), expiry(), dec!(-1));
        assert_eq!(resolve_closing_pnl(&c, &[a]), None);
    }

    #[test]
    fn test_zero_size_target_is_none() {
        let a = call(dec!(2), dec!(5));
        let c = call(dec!(0), dec!(7));
        assert_eq!(resolve_closing_pnl(&c, &[a]), None);
    }

    #[test]
    fn test_futures_ignore_stray_strike() {
        let perp = Leg::future(dec!(2), dec!(100));
        let mut with_strike = Leg::future(dec!(-1), dec!(104));
        with_strike.strike = Some(dec!(250));
        assert!(is_matching(&perp, &with_strike));
        assert_eq!(resolve_closing_pnl(&with_strike, &[perp]), Some(dec!(4)));
    }

    #[test]
    fn test_overflowing_notional_is_none() {
        let huge = call(Decimal::MAX, Decimal::MAX);
        let c = call(dec!(-1), dec!(7));
        assert_eq!(resolve_closing_pnl(&c, &[huge.clone(), huge]), None);

        let far_strike = Leg::option(LegKind::Call, Decimal::MIN, expiry(), dec!(2)).with_price(dec!(5));
        let mut c = call(dec!(-1), dec!(7));
        c.strike = Some(Decimal::MAX);
        assert!(!is_matching(&c, &far_strike));
    }
}
