//! Budget and payout math on exact decimals.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Earnings owed for a view count at a campaign's CPM rate.
///
/// `round(views / 1000 * cpm, 2)`. A submission with no snapshot earns zero.
#[must_use]
pub fn earnings(views: u64, cpm: Decimal) -> Decimal {
    (Decimal::from(views) / Decimal::from(1000) * cpm).round_dp(2)
}

/// Budget left to pay out; never negative.
#[must_use]
pub fn budget_remaining(total: Decimal, paid: Decimal) -> Decimal {
    (total - paid).max(Decimal::ZERO)
}

/// Percentage of the budget already paid, rounded to a whole number.
///
/// Zero when the campaign has no budget at all.
#[must_use]
pub fn percent_paid(total: Decimal, paid: Decimal) -> i32 {
    if total.is_zero() {
        return 0;
    }
    (paid / total * Decimal::from(100))
        .round()
        .to_i32()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn earnings_at_ten_cpm() {
        assert_eq!(earnings(2500, dec("10.00")), dec("25.00"));
    }

    #[test]
    fn earnings_round_to_cents() {
        // 1234 views at 7.50 cpm = 9.255 -> 9.26 (banker's rounding on the half cent)
        assert_eq!(earnings(1234, dec("7.50")), dec("9.26"));
    }

    #[test]
    fn zero_views_earn_nothing() {
        assert_eq!(earnings(0, dec("10.00")), dec("0.00"));
    }

    #[test]
    fn remaining_budget_floors_at_zero() {
        assert_eq!(budget_remaining(dec("100.00"), dec("30.00")), dec("70.00"));
        assert_eq!(budget_remaining(dec("100.00"), dec("130.00")), Decimal::ZERO);
    }

    #[test]
    fn percent_paid_rounds() {
        assert_eq!(percent_paid(dec("300.00"), dec("100.00")), 33);
        assert_eq!(percent_paid(dec("200.00"), dec("100.00")), 50);
    }

    #[test]
    fn percent_paid_of_zero_budget_is_zero() {
        assert_eq!(percent_paid(Decimal::ZERO, dec("50.00")), 0);
    }
}
