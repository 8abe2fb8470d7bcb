//! Fee calculation
//!
//! Pure, stateless pricing of a booking: subtotal, renter fee, lister fee,
//! renter total and lister payout, all in integer minor units. Rate math
//! runs in `rust_decimal` and each fee line is rounded half-up exactly once,
//! so rounding never compounds across intermediate steps.

use crate::types::{BookingError, FeeBreakdown, MinorUnits};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Platform commission rates
///
/// Defaults to the marketplace schedule: 7% charged to the renter on top of
/// the subtotal, 3% deducted from the owner's payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Fraction of the subtotal charged to the renter
    pub renter_fee_rate: Decimal,
    /// Fraction of the subtotal deducted from the owner's payout
    pub lister_fee_rate: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            renter_fee_rate: Decimal::new(7, 2),
            lister_fee_rate: Decimal::new(3, 2),
        }
    }
}

impl FeeSchedule {
    /// Create a schedule with custom rates
    pub fn new(renter_fee_rate: Decimal, lister_fee_rate: Decimal) -> Self {
        FeeSchedule {
            renter_fee_rate,
            lister_fee_rate,
        }
    }

    /// Price a stay of `nights` nights at `price_per_day` minor units
    ///
    /// `subtotal = nights × price_per_day` with checked arithmetic;
    /// `total = subtotal + renter_fee`; `lister_payout = subtotal − lister_fee`.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if any line overflows the minor-unit
    /// representation.
    pub fn quote(
        &self,
        nights: u32,
        price_per_day: MinorUnits,
    ) -> Result<FeeBreakdown, BookingError> {
        let subtotal = i64::from(nights)
            .checked_mul(price_per_day)
            .ok_or_else(|| BookingError::arithmetic_overflow("subtotal"))?;

        let renter_fee = fee_line(subtotal, self.renter_fee_rate, "renter_fee")?;
        let lister_fee = fee_line(subtotal, self.lister_fee_rate, "lister_fee")?;

        let total = subtotal
            .checked_add(renter_fee)
            .ok_or_else(|| BookingError::arithmetic_overflow("total"))?;
        let lister_payout = subtotal
            .checked_sub(lister_fee)
            .ok_or_else(|| BookingError::arithmetic_overflow("lister_payout"))?;

        Ok(FeeBreakdown {
            subtotal,
            renter_fee,
            lister_fee,
            total,
            lister_payout,
        })
    }
}

/// Round one fee line back to minor units, half-up, exactly once
fn fee_line(
    subtotal: MinorUnits,
    rate: Decimal,
    operation: &'static str,
) -> Result<MinorUnits, BookingError> {
    Decimal::from(subtotal)
        .checked_mul(rate)
        .ok_or_else(|| BookingError::arithmetic_overflow(operation))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| BookingError::arithmetic_overflow(operation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_quote_three_nights_at_fifty() {
        // 3 nights at 50.00: subtotal 150.00, renter fee 10.50,
        // total 160.50, lister fee 4.50, payout 145.50
        let quote = FeeSchedule::default().quote(3, 5000).unwrap();

        assert_eq!(quote.subtotal, 15000);
        assert_eq!(quote.renter_fee, 1050);
        assert_eq!(quote.total, 16050);
        assert_eq!(quote.lister_fee, 450);
        assert_eq!(quote.lister_payout, 14550);
    }

    #[rstest]
    // 1.05 * 0.07 = 0.0735 -> 7.35 cents -> 7
    #[case::rounds_down(1, 105, 7)]
    // 1.50 * 0.07 = 10.5 cents -> half-up -> 11
    #[case::rounds_midpoint_up(1, 150, 11)]
    // 10.00 * 0.07 = exactly 70 cents
    #[case::exact(1, 1000, 70)]
    #[case::zero_price(3, 0, 0)]
    fn test_renter_fee_rounding(
        #[case] nights: u32,
        #[case] price_per_day: MinorUnits,
        #[case] expected_fee: MinorUnits,
    ) {
        let quote = FeeSchedule::default().quote(nights, price_per_day).unwrap();
        assert_eq!(quote.renter_fee, expected_fee);
        assert_eq!(quote.total, quote.subtotal + expected_fee);
    }

    #[test]
    fn test_rounding_applies_once_not_per_night() {
        // Per-night fee would be round(0.35) * 30 = 0 or 30 depending on the
        // mistake; the correct single rounding is round(10.5) = 11.
        let quote = FeeSchedule::default().quote(30, 5).unwrap();
        assert_eq!(quote.subtotal, 150);
        assert_eq!(quote.renter_fee, 11);
    }

    #[test]
    fn test_payout_is_subtotal_minus_lister_fee() {
        let quote = FeeSchedule::default().quote(7, 12345).unwrap();
        assert_eq!(quote.lister_payout, quote.subtotal - quote.lister_fee);
        assert_eq!(quote.total, quote.subtotal + quote.renter_fee);
    }

    #[test]
    fn test_quote_overflow_is_rejected() {
        let result = FeeSchedule::default().quote(u32::MAX, i64::MAX / 2);
        assert!(matches!(
            result.unwrap_err(),
            BookingError::ArithmeticOverflow { .. }
        ));
    }

    #[test]
    fn test_custom_rates() {
        let schedule = FeeSchedule::new(Decimal::new(10, 2), Decimal::new(5, 2));
        let quote = schedule.quote(2, 10000).unwrap();
        assert_eq!(quote.renter_fee, 2000);
        assert_eq!(quote.lister_fee, 1000);
    }
}
